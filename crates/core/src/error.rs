use thiserror::Error;

use crate::model::{AttemptError, ScheduleError, SubjectError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
