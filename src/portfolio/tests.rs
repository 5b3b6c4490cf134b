#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::StorageConfig;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, PortfolioStore) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            uploads_directory: temp_dir.path().join("uploads"),
            temp_directory: temp_dir.path().join("tmp_uploads"),
            max_request_size_mb: 10,
            public_prefix: "/api/uploads".to_string(),
        };
        fs::create_dir_all(&config.temp_directory).unwrap();
        (temp_dir, PortfolioStore::new(config))
    }

    fn staged(store: &PortfolioStore, name: &str, mime: &str, bytes: &[u8]) -> StagedFile {
        let path = store
            .get_config()
            .temp_directory
            .join(format!("1700000000000-{}", name));
        fs::write(&path, bytes).unwrap();
        StagedFile {
            original_name: name.to_string(),
            content_type: mime.to_string(),
            size: Some(bytes.len() as u64),
            path,
        }
    }

    fn pair(store: &PortfolioStore, before: (&str, &str), after: (&str, &str)) -> StagedUpload {
        StagedUpload {
            before: Some(staged(store, before.0, before.1, b"before-bytes")),
            after: Some(staged(store, after.0, after.1, b"after-bytes")),
            thumbnail: None,
            new_category: None,
        }
    }

    fn temp_is_empty(store: &PortfolioStore) -> bool {
        fs::read_dir(&store.get_config().temp_directory)
            .unwrap()
            .next()
            .is_none()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_generated_folder_names_are_unique_and_safe() {
        let a = PortfolioStore::generate_folder_name();
        let b = PortfolioStore::generate_folder_name();
        assert_ne!(a, b);

        let (millis, suffix) = a.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
        assert!(ensure_folder_name(&a).is_ok());
    }

    #[tokio::test]
    async fn test_create_in_shorts_lists_one_complete_folder() {
        let (_tmp, store) = setup_store();
        let upload = pair(&store, ("raw.PNG", "image/png"), ("cut.mp4", "video/mp4"));

        let created = store.create_item("shorts", upload).await.unwrap();
        assert_eq!(created.category, Category::Shorts);
        assert_eq!(created.files.before.filename, "Before.png");
        assert_eq!(created.files.after.filename, "After.mp4");
        assert!(created.files.thumbnail.is_none());
        assert_eq!(
            created.files.after.link,
            format!("/api/uploads/shorts/{}/After.mp4", created.folder)
        );

        let listing = store.list_category("shorts").await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].folder, created.folder);
        assert!(listing[0].complete);
        let names: Vec<&str> = listing[0].files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["After.mp4", "Before.png"]);

        // staged files were moved, not copied, and the marker is gone
        assert!(temp_is_empty(&store));
        let item = store.item_dir(Category::Shorts, &created.folder);
        assert!(!item.join(PENDING_MARKER).exists());
    }

    #[tokio::test]
    async fn test_create_in_thumbnail_links_after_png() {
        let (_tmp, store) = setup_store();
        let mut upload = pair(&store, ("a.png", "image/png"), ("b.png", "image/png"));
        upload.thumbnail = Some(staged(&store, "c.webp", "image/webp", b"thumb"));

        let created = store.create_item("thumbnail", upload).await.unwrap();
        let link = &created.files.after.link;
        assert!(link.starts_with("/api/uploads/thumbnail/"));
        assert!(link.ends_with("/After.png"));
        assert_eq!(created.files.thumbnail.unwrap().filename, "Thumbnail.webp");
    }

    #[tokio::test]
    async fn test_create_rejects_video_in_thumbnail_category() {
        let (_tmp, store) = setup_store();
        let upload = pair(&store, ("a.png", "image/png"), ("b.mp4", "video/mp4"));

        let err = store.create_item("thumbnail", upload).await.unwrap_err();
        assert!(matches!(err, PortfolioError::Rejected { .. }));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);

        assert!(temp_is_empty(&store));
        assert!(!store.category_dir(Category::Thumbnail).exists());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_category_and_discards_temps() {
        let (_tmp, store) = setup_store();
        let upload = pair(&store, ("a.png", "image/png"), ("b.png", "image/png"));

        let err = store.create_item("podcasts", upload).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid category name.");
        assert!(temp_is_empty(&store));
    }

    #[tokio::test]
    async fn test_create_requires_both_files() {
        let (_tmp, store) = setup_store();
        let upload = StagedUpload {
            before: Some(staged(&store, "a.png", "image/png", b"x")),
            ..Default::default()
        };

        let err = store.create_item("shorts", upload).await.unwrap_err();
        assert!(matches!(err, PortfolioError::MissingRequiredFiles));
        assert!(temp_is_empty(&store));
    }

    #[tokio::test]
    async fn test_create_refuses_files_outside_staging() {
        let (tmp, store) = setup_store();
        let outside = tmp.path().join("elsewhere.png");
        fs::write(&outside, b"x").unwrap();

        let mut upload = pair(&store, ("a.png", "image/png"), ("b.png", "image/png"));
        if let Some(after) = upload.after.as_mut() {
            after.path = store
                .get_config()
                .temp_directory
                .join("..")
                .join("elsewhere.png");
        }

        let err = store.create_item("shorts", upload).await.unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidUploadPath));
        // the file outside the staging area is never touched
        assert!(outside.exists());
        assert!(!store.category_dir(Category::Shorts).exists());
    }

    #[tokio::test]
    async fn test_edit_replaces_role_with_new_extension() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "video-editing",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();

        let upload = StagedUpload {
            after: Some(staged(&store, "final.mov", "video/quicktime", b"new")),
            ..Default::default()
        };
        let edited = store
            .edit_item("video-editing", &created.folder, upload)
            .await
            .unwrap();

        assert_eq!(edited.category, Category::VideoEditing);
        assert_eq!(edited.files.after.as_ref().unwrap().filename, "After.mov");
        assert!(edited.files.before.is_none());

        let item = store.item_dir(Category::VideoEditing, &created.folder);
        assert_eq!(file_names(&item), vec!["After.mov", "Before.png"]);
        assert_eq!(fs::read(item.join("After.mov")).unwrap(), b"new");
        assert!(temp_is_empty(&store));
    }

    #[tokio::test]
    async fn test_edit_moves_item_between_categories() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();

        let upload = StagedUpload {
            new_category: Some(" motion-graphics ".to_string()),
            ..Default::default()
        };
        let edited = store
            .edit_item("shorts", &created.folder, upload)
            .await
            .unwrap();
        assert_eq!(edited.category, Category::MotionGraphics);

        assert!(!store.item_dir(Category::Shorts, &created.folder).exists());
        assert!(
            store
                .item_dir(Category::MotionGraphics, &created.folder)
                .join("After.png")
                .exists()
        );
        assert!(matches!(
            store
                .serve_file(
                    "shorts",
                    &created.folder,
                    "After.png",
                    &axum::http::HeaderMap::new()
                )
                .await,
            Err(PortfolioError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_refuses_to_overwrite_existing_destination() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();
        fs::create_dir_all(store.item_dir(Category::Thumbnail, &created.folder)).unwrap();

        let upload = StagedUpload {
            new_category: Some("thumbnail".to_string()),
            ..Default::default()
        };
        let err = store
            .edit_item("shorts", &created.folder, upload)
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::FolderConflict(_)));
        assert!(store.item_dir(Category::Shorts, &created.folder).exists());
    }

    #[tokio::test]
    async fn test_edit_validation_failure_leaves_item_untouched() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.mp4", "video/mp4")),
            )
            .await
            .unwrap();

        // moving a video item into the image-only category fails on the new file
        let upload = StagedUpload {
            before: Some(staged(&store, "x.mp4", "video/mp4", b"v")),
            new_category: Some("thumbnail".to_string()),
            ..Default::default()
        };
        let err = store
            .edit_item("shorts", &created.folder, upload)
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Rejected { .. }));

        let item = store.item_dir(Category::Shorts, &created.folder);
        assert_eq!(file_names(&item), vec!["After.mp4", "Before.png"]);
        assert!(temp_is_empty(&store));
    }

    #[tokio::test]
    async fn test_create_move_failure_rolls_back_item() {
        let (_tmp, store) = setup_store();
        let upload = pair(&store, ("a.png", "image/png"), ("b.png", "image/png"));
        // the staged file vanishes between validation and the rename
        fs::remove_file(&upload.before.as_ref().unwrap().path).unwrap();

        let err = store.create_item("shorts", upload).await.unwrap_err();
        assert!(matches!(err, PortfolioError::StorageFailed(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let shorts = store.category_dir(Category::Shorts);
        assert!(file_names(&shorts).is_empty());
        assert!(temp_is_empty(&store));
        assert_eq!(store.count().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_edit_move_failure_restores_item() {
        let (_tmp, store) = setup_store();
        let upload = StagedUpload {
            before: Some(staged(&store, "a.png", "image/png", b"old-before")),
            after: Some(staged(&store, "b.png", "image/png", b"old-after")),
            thumbnail: None,
            new_category: None,
        };
        let created = store.create_item("shorts", upload).await.unwrap();

        let upload = StagedUpload {
            before: Some(staged(&store, "c.png", "image/png", b"new-before")),
            after: Some(staged(&store, "d.mp4", "video/mp4", b"new-after")),
            thumbnail: None,
            new_category: Some("video-editing".to_string()),
        };
        fs::remove_file(&upload.after.as_ref().unwrap().path).unwrap();

        let err = store
            .edit_item("shorts", &created.folder, upload)
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::StorageFailed(_)));

        // back in the source category with the original bytes
        let item = store.item_dir(Category::Shorts, &created.folder);
        assert!(!store.item_dir(Category::VideoEditing, &created.folder).exists());
        assert_eq!(file_names(&item), vec!["After.png", "Before.png"]);
        assert_eq!(fs::read(item.join("Before.png")).unwrap(), b"old-before");
        assert_eq!(fs::read(item.join("After.png")).unwrap(), b"old-after");
        assert!(temp_is_empty(&store));
    }

    #[tokio::test]
    async fn test_edit_missing_folder_is_not_found() {
        let (_tmp, store) = setup_store();
        let err = store
            .edit_item("shorts", "1700000000000_missing1", StagedUpload::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Source folder not found.");

        let err = store
            .edit_item("nope", "x", StagedUpload::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid source category.");

        let err = store
            .edit_item("shorts", "../shorts", StagedUpload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidFolderName));
    }

    #[tokio::test]
    async fn test_listing_skips_pending_and_hidden_entries() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();

        let shorts = store.category_dir(Category::Shorts);
        let pending = shorts.join("1700000000000_pending0");
        fs::create_dir_all(&pending).unwrap();
        fs::write(pending.join(PENDING_MARKER), b"").unwrap();
        fs::create_dir_all(shorts.join(".trash")).unwrap();

        let half = shorts.join("1600000000000_halfdone");
        fs::create_dir_all(&half).unwrap();
        fs::write(half.join("Before.png"), b"x").unwrap();

        // directories inside an item are not files and get no url
        let item = store.item_dir(Category::Shorts, &created.folder);
        fs::create_dir_all(item.join("After.raw")).unwrap();

        let listing = store.list_category("shorts").await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].folder, "1600000000000_halfdone");
        assert!(!listing[0].complete);
        assert!(listing[1].complete);
        let names: Vec<&str> = listing[1].files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["After.png", "Before.png"]);

        let counts = store.count().await.unwrap();
        assert_eq!(counts.total_count, 2);
        assert_eq!(counts.counts_by_category.get("shorts"), Some(&2));
        assert!(!counts.counts_by_category.contains_key("thumbnail"));
    }

    #[tokio::test]
    async fn test_listing_unknown_or_absent_category_is_not_found() {
        let (_tmp, store) = setup_store();
        assert!(matches!(
            store.list_category("podcasts").await,
            Err(PortfolioError::NotFound("Category not found"))
        ));
        assert!(matches!(
            store.list_category("shorts").await,
            Err(PortfolioError::NotFound("Category not found"))
        ));
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_list_all_ignores_unknown_directories() {
        let (_tmp, store) = setup_store();
        store
            .create_item(
                "thumbnail",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();
        fs::create_dir_all(store.uploads_root().join("scratch").join("x")).unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["thumbnail"]);
        assert_eq!(all["thumbnail"].len(), 1);
    }

    #[tokio::test]
    async fn test_recursive_delete_leaves_no_trace() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();

        let outcome = store
            .delete_item("shorts", &created.folder, DeleteStrategy::Recursive)
            .await
            .unwrap();
        assert_eq!(outcome.files_deleted, 2);
        assert_eq!(outcome.deleted_category, Category::Shorts);
        assert!(!store.item_dir(Category::Shorts, &created.folder).exists());

        // a second delete has nothing to remove
        let err = store
            .delete_item("shorts", &created.folder, DeleteStrategy::Recursive)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Portfolio item not found.");
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_validates_names() {
        let (_tmp, store) = setup_store();
        let err = store
            .delete_item("nope", "x", DeleteStrategy::Recursive)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid category name.");

        let err = store
            .delete_item("shorts", "..", DeleteStrategy::FileByFile)
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidFolderName));

        let shorts = store.category_dir(Category::Shorts);
        fs::create_dir_all(&shorts).unwrap();
        fs::write(shorts.join("stray.txt"), b"x").unwrap();
        let err = store
            .delete_item("shorts", "stray.txt", DeleteStrategy::Recursive)
            .await
            .unwrap_err();
        assert!(matches!(err, PortfolioError::NotAFolder));
    }

    #[tokio::test]
    async fn test_safe_delete_removes_every_file() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();

        let outcome = store
            .delete_item("shorts", &created.folder, DeleteStrategy::FileByFile)
            .await
            .unwrap();
        assert_eq!(outcome.files_deleted, 2);
        assert!(outcome.failed_files.is_empty());
        assert!(!store.item_dir(Category::Shorts, &created.folder).exists());
    }

    #[tokio::test]
    async fn test_safe_delete_reports_undeletable_entries() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();
        let item = store.item_dir(Category::Shorts, &created.folder);
        // a directory cannot be unlinked as a file
        fs::create_dir(item.join("extras")).unwrap();

        let err = store
            .delete_item("shorts", &created.folder, DeleteStrategy::FileByFile)
            .await
            .unwrap_err();
        match err {
            PortfolioError::PartialDelete {
                deleted_files,
                ref failed_files,
            } => {
                assert_eq!(deleted_files, 2);
                assert_eq!(failed_files, &vec!["extras".to_string()]);
            }
            ref other => panic!("expected partial delete, got {:?}", other),
        }
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(item.join("extras").exists());
    }

    #[tokio::test]
    async fn test_serve_file_rejects_hidden_and_traversal() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();
        let headers = axum::http::HeaderMap::new();

        let ok = store
            .serve_file("shorts", &created.folder, "After.png", &headers)
            .await
            .unwrap();
        assert_eq!(ok.status(), axum::http::StatusCode::OK);
        assert_eq!(
            ok.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            "image/png"
        );

        assert!(
            store
                .serve_file("shorts", &created.folder, "../../secret", &headers)
                .await
                .is_err()
        );
        assert!(
            store
                .serve_file("shorts", &created.folder, PENDING_MARKER, &headers)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_repair_clears_unfinished_work() {
        let (_tmp, store) = setup_store();
        let created = store
            .create_item(
                "shorts",
                pair(&store, ("a.png", "image/png"), ("b.png", "image/png")),
            )
            .await
            .unwrap();
        let item = store.item_dir(Category::Shorts, &created.folder);

        // an edit that stopped between stashing and moving in the replacement
        fs::rename(item.join("After.png"), item.join(".After.png.replaced")).unwrap();

        let pending = store.category_dir(Category::Shorts).join("1700000000000_pending0");
        fs::create_dir_all(&pending).unwrap();
        fs::write(pending.join(PENDING_MARKER), b"").unwrap();

        let abandoned = store.get_config().temp_directory.join("1-abandoned.png");
        fs::write(&abandoned, b"x").unwrap();

        assert_eq!(
            store.find_pending_items(),
            vec!["shorts/1700000000000_pending0".to_string()]
        );

        let dry = store
            .repair(&RepairOptions {
                dry_run: true,
                max_temp_age_minutes: 0,
            })
            .await
            .unwrap();
        assert_eq!(dry.removed_pending.len(), 1);
        assert!(pending.exists());

        let report = store
            .repair(&RepairOptions {
                dry_run: false,
                max_temp_age_minutes: 0,
            })
            .await
            .unwrap();
        assert_eq!(report.removed_pending, vec!["shorts/1700000000000_pending0"]);
        assert_eq!(report.resolved_backups.len(), 1);
        assert!(report.incomplete.is_empty());
        assert!(!pending.exists());
        assert!(item.join("After.png").exists());
        assert!(!abandoned.exists());

        let again = store.repair(&RepairOptions::default()).await.unwrap();
        assert!(again.is_clean());
    }

    #[tokio::test]
    async fn test_repair_with_huge_age_keeps_temp_files() {
        let (_tmp, store) = setup_store();
        let fresh = store.get_config().temp_directory.join("1-fresh.png");
        fs::write(&fresh, b"x").unwrap();

        let report = store
            .repair(&RepairOptions {
                dry_run: false,
                max_temp_age_minutes: u64::MAX,
            })
            .await
            .unwrap();
        assert!(report.removed_temp.is_empty());
        assert!(fresh.exists());
    }
}
