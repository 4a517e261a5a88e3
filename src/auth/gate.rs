//! Authorization gate for classified catalog requests
//!
//! Guards are plain functions over a [`GateRequest`]. The dispatcher runs
//! them in order for every classification of a request and stops at the
//! first denial. Anything the gate cannot establish (no identity, unknown
//! role, unclassifiable path) is a denial.

use crate::models::user::SessionUser;

use super::{
    classifier::{Classification, Operation},
    roles,
};

/// Login page, target of unauthenticated access
pub const LOGIN_PATH: &str = "/users/login";
/// Warning page, target of insufficient-role access
pub const WARNING_PATH: &str = "/users/stop";

pub const LOGIN_REQUIRED_NOTICE: &str = "You need to login first!";
pub const NOT_AUTHORIZED_NOTICE: &str = "You're not authorized to access this page!";

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No authenticated identity on the request
    Unauthenticated,
    /// Identity present but its role does not grant the operation
    Forbidden,
}

impl Denial {
    /// One-shot notice shown on the page the user is sent to
    pub fn notice(&self) -> &'static str {
        match self {
            Denial::Unauthenticated => LOGIN_REQUIRED_NOTICE,
            Denial::Forbidden => NOT_AUTHORIZED_NOTICE,
        }
    }

    pub fn redirect_to(&self) -> &'static str {
        match self {
            Denial::Unauthenticated => LOGIN_PATH,
            Denial::Forbidden => WARNING_PATH,
        }
    }
}

/// Outcome of a guard or of the whole gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// What a guard gets to look at
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub identity: Option<&'a SessionUser>,
    /// `None` when the path matched a rule but could not be classified
    pub operation: Option<Operation>,
}

pub type Guard = fn(&GateRequest<'_>) -> Decision;

/// Guards applied to each classification, in order
pub const GUARDS: &[Guard] = &[confirm_authentication, confirm_role];

/// Pass iff the request carries an authenticated identity
pub fn confirm_authentication(request: &GateRequest<'_>) -> Decision {
    match request.identity {
        Some(_) => Decision::Allow,
        None => Decision::Deny(Denial::Unauthenticated),
    }
}

/// Pass iff the identity's role grants the requested operation
pub fn confirm_role(request: &GateRequest<'_>) -> Decision {
    let (Some(identity), Some(operation)) = (request.identity, request.operation) else {
        return Decision::Deny(Denial::Forbidden);
    };

    if roles::is_permitted(identity.role, operation) {
        Decision::Allow
    } else {
        Decision::Deny(Denial::Forbidden)
    }
}

/// Run every guard for every classification, in order.
///
/// An empty `classifications` slice means the path is not gated.
pub fn evaluate(
    identity: Option<&SessionUser>,
    classifications: &[Result<Classification, String>],
) -> Decision {
    for classification in classifications {
        let request = GateRequest {
            identity,
            operation: classification.as_ref().ok().map(|c| c.operation),
        };

        for guard in GUARDS {
            if let Decision::Deny(denial) = guard(&request) {
                return Decision::Deny(denial);
            }
        }
    }

    Decision::Allow
}
