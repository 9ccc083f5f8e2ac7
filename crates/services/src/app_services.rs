use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::api::{ApiClient, ApiConfig, TeacherCatalog, TestCatalog};
use crate::assessment::{AssessmentConfig, AssessmentService};
use crate::demo::{LocalGrader, demo_paper};
use crate::error::AppServicesError;
use crate::identity_service::IdentityService;

/// Assembles app-facing services over one storage backend and one API client.
#[derive(Clone)]
pub struct AppServices {
    identity: Arc<IdentityService>,
    assessments: Arc<AssessmentService>,
    demo: Arc<AssessmentService>,
    catalog: Arc<dyn TestCatalog>,
    teacher: Arc<dyn TeacherCatalog>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the REST API.
    ///
    /// Restores the remembered identity before returning.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or identity
    /// restore fails.
    pub async fn new_sqlite(
        db_url: &str,
        api: ApiConfig,
        clock: Clock,
        config: AssessmentConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, api, clock, config).await
    }

    /// Build services over an existing storage backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Identity` if the remembered identity
    /// cannot be restored.
    pub async fn from_storage(
        storage: Storage,
        api: ApiConfig,
        clock: Clock,
        config: AssessmentConfig,
    ) -> Result<Self, AppServicesError> {
        let client = Arc::new(ApiClient::new(api));

        let identity = Arc::new(IdentityService::new(
            Arc::clone(&storage.identity),
            client.clone(),
        ));
        identity.init().await?;

        let assessments = Arc::new(
            AssessmentService::new(clock, client.clone(), client.clone()).with_config(config),
        );

        let grader = Arc::new(LocalGrader::new(demo_paper()));
        let demo = Arc::new(
            AssessmentService::new(clock, client.clone(), grader).with_config(config),
        );

        Ok(Self {
            identity,
            assessments,
            demo,
            catalog: client.clone(),
            teacher: client,
        })
    }

    #[must_use]
    pub fn identity(&self) -> Arc<IdentityService> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    /// Assessment service whose submissions are graded locally.
    #[must_use]
    pub fn demo(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.demo)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn TestCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Authoring and review for signed-in teachers.
    #[must_use]
    pub fn teacher(&self) -> Arc<dyn TeacherCatalog> {
        Arc::clone(&self.teacher)
    }
}
