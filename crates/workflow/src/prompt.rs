#![forbid(unsafe_code)]

use rt_core::MergeConflict;

/// What the user is asked to approve before a batch runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub message: String,
    pub targets: usize,
    pub merge: Option<MergeConflict>,
}

pub trait ConfirmPrompt {
    fn confirm(&mut self, request: &Confirmation) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: FnMut(&Confirmation) -> bool,
{
    fn confirm(&mut self, request: &Confirmation) -> bool {
        self(request)
    }
}

/// Approves everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoConfirm;

impl ConfirmPrompt for AutoConfirm {
    fn confirm(&mut self, _request: &Confirmation) -> bool {
        true
    }
}
