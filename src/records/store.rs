use super::{ContactRequest, NewContact, RecordDatabase, RecordsError, VisitOutcome, Visitor};
use crate::RecordsConfig;
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct RecordStore {
    db: Arc<RwLock<RecordDatabase>>,
    path: Option<PathBuf>,
    visitor_window: Duration,
}

impl RecordStore {
    /// Loads the records file if it exists. A missing file starts empty and is
    /// created on the first write.
    pub async fn open(config: RecordsConfig) -> Result<Self, RecordsError> {
        let db = match &config.database {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(json) => {
                    let db: RecordDatabase = serde_json::from_str(&json)?;
                    info!(
                        "Loaded {} visitors and {} contact messages from {:?}",
                        db.visitors.len(),
                        db.contacts.len(),
                        path
                    );
                    db
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("Records file {:?} not found, starting empty", path);
                    RecordDatabase::default()
                }
                Err(e) => return Err(e.into()),
            },
            None => RecordDatabase::default(),
        };

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            path: config.database,
            visitor_window: Duration::hours(config.visitor_window_hours),
        })
    }

    pub fn in_memory(visitor_window_hours: i64) -> Self {
        Self {
            db: Arc::new(RwLock::new(RecordDatabase::default())),
            path: None,
            visitor_window: Duration::hours(visitor_window_hours),
        }
    }

    pub fn visitor_window_hours(&self) -> i64 {
        self.visitor_window.num_hours()
    }

    /// Written to a sibling file and renamed over the old one.
    async fn persist(&self, db: &RecordDatabase) -> Result<(), RecordsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(db)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Saved records to {:?}", path);
        Ok(())
    }

    pub async fn record_visit(
        &self,
        ip: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> Result<VisitOutcome, RecordsError> {
        let mut db = self.db.write().await;
        let cutoff = now - self.visitor_window;
        if db
            .visitors
            .iter()
            .any(|v| v.ip == ip && v.created_at >= cutoff)
        {
            debug!("Visitor {} already recorded inside the window", ip);
            return Ok(VisitOutcome::AlreadyRecorded);
        }

        let visitor = Visitor {
            id: Uuid::new_v4(),
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            created_at: now,
        };
        let id = visitor.id;
        db.visitors.push(visitor);
        if let Err(e) = self.persist(&db).await {
            db.visitors.pop();
            return Err(e);
        }
        Ok(VisitOutcome::Counted(id))
    }

    pub async fn visitor_count(&self) -> usize {
        self.db.read().await.visitors.len()
    }

    pub async fn visitors(&self) -> Vec<Visitor> {
        self.db.read().await.visitors.clone()
    }

    pub async fn add_contact(
        &self,
        contact: NewContact,
        now: DateTime<Utc>,
    ) -> Result<ContactRequest, RecordsError> {
        fn required(value: Option<String>) -> Result<String, RecordsError> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(RecordsError::MissingContactFields)
        }

        let request = ContactRequest {
            id: Uuid::new_v4(),
            first_name: required(contact.first_name)?,
            last_name: contact
                .last_name
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            email: required(contact.email)?,
            project_type: required(contact.project_type)?,
            message: required(contact.message)?,
            created_at: now,
        };

        let mut db = self.db.write().await;
        db.contacts.push(request.clone());
        if let Err(e) = self.persist(&db).await {
            db.contacts.pop();
            return Err(e);
        }
        info!("Stored contact message {} ({})", request.id, request.project_type);
        Ok(request)
    }

    /// Newest first.
    pub async fn contacts(&self) -> Vec<ContactRequest> {
        let mut contacts = self.db.read().await.contacts.clone();
        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        contacts
    }

    pub async fn delete_contact(&self, id: &str) -> Result<ContactRequest, RecordsError> {
        let id = Uuid::parse_str(id.trim()).map_err(|_| RecordsError::InvalidId)?;

        let mut db = self.db.write().await;
        let index = db
            .contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(RecordsError::MessageNotFound)?;
        let removed = db.contacts.remove(index);
        if let Err(e) = self.persist(&db).await {
            db.contacts.insert(index, removed);
            return Err(e);
        }
        info!("Deleted contact message {}", id);
        Ok(removed)
    }
}
