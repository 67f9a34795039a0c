use super::SubmissionStore;
use crate::models::{Submission, SubmissionRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::info;

const COLLECTION: &str = "users";

#[derive(Debug, Serialize, Deserialize)]
struct SubmissionDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(flatten)]
    submission: Submission,
    #[serde(rename = "__v", default)]
    version: i32,
}

impl From<SubmissionDocument> for SubmissionRecord {
    fn from(document: SubmissionDocument) -> Self {
        Self {
            id: document.id.to_hex(),
            submission: document.submission,
            version: document.version,
        }
    }
}

pub struct MongoSubmissionStore {
    collection: Collection<SubmissionDocument>,
}

impl MongoSubmissionStore {
    /// Connect and ping the server so an unreachable database fails here
    /// rather than on the first request.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| Error::Database(format!("Invalid connection string: {}", e)))?;
        let hosts = options
            .hosts
            .iter()
            .map(|host| host.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let client = Client::with_options(options)
            .map_err(|e| Error::Database(format!("Failed to create client: {}", e)))?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| Error::Database(format!("Failed to connect: {}", e)))?;

        info!("MongoDB connected, host: {}, database: {}", hosts, database);

        Ok(Self {
            collection: db.collection(COLLECTION),
        })
    }
}

#[async_trait]
impl SubmissionStore for MongoSubmissionStore {
    async fn insert(&self, submission: Submission) -> Result<SubmissionRecord> {
        let document = SubmissionDocument {
            id: ObjectId::new(),
            submission,
            version: 0,
        };

        self.collection
            .insert_one(&document)
            .await
            .map_err(|e| Error::Database(format!("Failed to insert submission: {}", e)))?;

        Ok(document.into())
    }

    async fn list(&self) -> Result<Vec<SubmissionRecord>> {
        let cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| Error::Database(format!("Failed to query submissions: {}", e)))?;

        let documents: Vec<SubmissionDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| Error::Database(format!("Failed to read submissions: {}", e)))?;

        Ok(documents.into_iter().map(SubmissionRecord::from).collect())
    }
}
