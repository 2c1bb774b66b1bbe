//! Form Session: the working draft behind one create/edit dialog.

use shared::{
    domain::{Record, ResourceId},
    error::FieldErrors,
    schema::ResourceSchema,
};
use thiserror::Error;
use tracing::debug;

use crate::{controller::ResourceListController, error::ControllerError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("form session is already closed")]
    Closed,
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// Draft state for a single dialog. The draft is only merged into a
/// controller's collection through a successful [`FormSession::submit`];
/// a failed submit keeps it intact for retry.
#[derive(Debug, Clone)]
pub struct FormSession<F> {
    target: Option<ResourceId>,
    draft: F,
    submitting: bool,
    validation_errors: FieldErrors,
    last_error: Option<ControllerError>,
    open: bool,
}

impl<F: ResourceSchema> FormSession<F> {
    pub fn create(draft: F) -> Self {
        Self {
            target: None,
            draft,
            submitting: false,
            validation_errors: FieldErrors::new(),
            last_error: None,
            open: true,
        }
    }

    pub fn edit(record: &Record<F>) -> Self {
        Self {
            target: Some(record.id.clone()),
            ..Self::create(record.fields.clone())
        }
    }

    pub fn target(&self) -> Option<&ResourceId> {
        self.target.as_ref()
    }

    pub fn is_edit(&self) -> bool {
        self.target.is_some()
    }

    pub fn draft(&self) -> &F {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut F {
        &mut self.draft
    }

    pub fn submitting(&self) -> bool {
        self.submitting
    }

    pub fn validation_errors(&self) -> &FieldErrors {
        &self.validation_errors
    }

    pub fn last_error(&self) -> Option<&ControllerError> {
        self.last_error.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Normalises the draft and runs the resource's field rules.
    pub fn validate(&mut self) -> bool {
        self.draft.normalize();
        match self.draft.validate() {
            Ok(()) => {
                self.validation_errors.clear();
                true
            }
            Err(errors) => {
                self.validation_errors = errors;
                false
            }
        }
    }

    /// Validates, then creates or updates through `controller`. Closes the
    /// session on success and returns the confirmed record (`None` only when
    /// the server acknowledged a create without identifying the entity).
    pub async fn submit(
        &mut self,
        controller: &ResourceListController<F>,
    ) -> Result<Option<Record<F>>, FormError> {
        if !self.open {
            return Err(FormError::Closed);
        }
        if !self.validate() {
            let err = ControllerError::Invalid(self.validation_errors.clone());
            self.last_error = Some(err.clone());
            return Err(err.into());
        }

        self.submitting = true;
        self.last_error = None;
        let outcome = match &self.target {
            Some(id) => controller.update(id, self.draft.clone()).await.map(Some),
            None => controller.create(self.draft.clone()).await,
        };
        self.submitting = false;

        match outcome {
            Ok(record) => {
                debug!(resource = %F::KIND, target = ?self.target, "form: submitted, closing");
                self.open = false;
                Ok(record)
            }
            Err(err) => {
                if let Some(errors) = err.field_errors() {
                    self.validation_errors.merge(errors.clone());
                }
                self.last_error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    pub fn cancel(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
