use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::middlewares::auth::JwtClaims;
use crate::store::{AssessmentStore, MongoStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn AssessmentStore>,
    pub grade_authorizer: Arc<dyn GradeAuthorizer>,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: mongodb::Client) -> anyhow::Result<Self> {
        let store = MongoStore::new(mongo_client, &config.mongo_database).await?;
        tracing::info!("MongoDB store initialized");

        Ok(Self {
            config,
            store: Arc::new(store),
            grade_authorizer: Arc::new(RoleGradeAuthorizer),
        })
    }

    /// Build state around an explicit store and authorizer. Used by the
    /// test harness with MemoryStore.
    pub fn with_store(
        config: Config,
        store: Arc<dyn AssessmentStore>,
        grade_authorizer: Arc<dyn GradeAuthorizer>,
    ) -> Self {
        Self {
            config,
            store,
            grade_authorizer,
        }
    }
}

/// Authorization port for manual grading. The real decision belongs to
/// the platform's authorization service; the engine only consumes a
/// yes/no per (identity, definition).
#[async_trait]
pub trait GradeAuthorizer: Send + Sync {
    async fn can_grade(&self, claims: &JwtClaims, definition_id: &str) -> bool;
}

/// Role-based default: teachers and admins grade everything.
pub struct RoleGradeAuthorizer;

#[async_trait]
impl GradeAuthorizer for RoleGradeAuthorizer {
    async fn can_grade(&self, claims: &JwtClaims, _definition_id: &str) -> bool {
        matches!(claims.role.as_str(), "teacher" | "admin")
    }
}

pub mod answer_service;
pub mod attempt_service;
pub mod definition_service;
pub mod grading_service;
pub mod history_service;
pub mod ordering;
pub mod question_bank;
pub mod scoring;
