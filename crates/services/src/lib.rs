#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempt_service;
pub mod config;
pub mod error;
pub mod progress_service;
pub mod schedule_service;
pub mod store;
pub mod subject_service;

pub use tracker_core::Clock;

pub use app_services::AppServices;
pub use attempt_service::AttemptService;
pub use config::TrackerConfig;
pub use error::{
    AppServicesError, AttemptServiceError, ProgressServiceError, ScheduleServiceError, StoreError,
    SubjectServiceError,
};
pub use progress_service::{ProgressService, SubjectOverview, SubjectReport};
pub use schedule_service::ScheduleService;
pub use store::TrackerStore;
pub use subject_service::{SubjectFilter, SubjectService};
