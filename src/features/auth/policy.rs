//! Role and ownership rules for every protected operation.
//!
//! Handlers and services call [`authorize`] with the caller, the action they
//! are about to perform and the resource it targets. Admins and officials are
//! treated alike ("staff"); citizens are limited to their own reports and to
//! read-only access on alerts and schedules.

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reports::models::ReportStatus;

pub const NOT_PENDING_UPDATE_MESSAGE: &str = "You can only update reports that are still pending";
pub const NOT_PENDING_DELETE_MESSAGE: &str = "You can only delete pending reports";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    /// `restricted_fields` is set when the update touches anything other
    /// than a report's title or description
    Update {
        restricted_fields: bool,
    },
    Delete,
    Comment,
    ChangeStatus,
    ViewStats,
}

/// Ownership facts about a single report
#[derive(Debug, Clone, Copy)]
pub struct ReportAccess {
    pub owner_id: Uuid,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource {
    Report(ReportAccess),
    ReportCollection,
    Alert { is_active: bool },
    AlertCollection,
    Schedule,
}

pub fn authorize(actor: &AuthenticatedUser, action: Action, resource: Resource) -> Result<()> {
    if actor.is_staff() {
        return Ok(());
    }

    match (resource, action) {
        (Resource::ReportCollection, Action::Read | Action::Create) => Ok(()),
        (Resource::ReportCollection, Action::ViewStats) => Err(forbidden(
            "Only officials and admins can view report statistics",
        )),
        (Resource::ReportCollection, _) => Err(forbidden("Access denied")),

        (Resource::Report(_), Action::ChangeStatus) => Err(forbidden(
            "Only officials and admins can update report status",
        )),
        (Resource::Report(report), action) => authorize_own_report(actor, action, report),

        (Resource::Alert { is_active: false }, Action::Read) => Err(forbidden(
            "Access denied. This alert is no longer active.",
        )),
        (Resource::Alert { .. } | Resource::AlertCollection, Action::Read) => Ok(()),
        (Resource::Alert { .. } | Resource::AlertCollection, _) => {
            Err(forbidden("Only officials and admins can manage alerts"))
        }

        (Resource::Schedule, Action::Read) => Ok(()),
        (Resource::Schedule, _) => Err(forbidden(
            "Only officials and admins can manage service schedules",
        )),
    }
}

fn authorize_own_report(
    actor: &AuthenticatedUser,
    action: Action,
    report: ReportAccess,
) -> Result<()> {
    let owns = report.owner_id == actor.id;
    let pending = report.status == ReportStatus::Pending;

    match action {
        Action::Read if owns => Ok(()),
        Action::Read => Err(forbidden("You do not have permission to view this report")),

        Action::Update { .. } if !owns => Err(forbidden("You can only update your own reports")),
        Action::Update { .. } if !pending => Err(forbidden(NOT_PENDING_UPDATE_MESSAGE)),
        Action::Update {
            restricted_fields: true,
        } => Err(forbidden(
            "Citizens can only update the title and description of a report",
        )),
        Action::Update { .. } => Ok(()),

        Action::Delete if !owns => Err(forbidden("You can only delete your own reports")),
        Action::Delete if !pending => Err(forbidden(NOT_PENDING_DELETE_MESSAGE)),
        Action::Delete => Ok(()),

        Action::Comment if owns => Ok(()),
        Action::Comment => Err(forbidden("You can only comment on your own reports")),

        Action::Create | Action::ChangeStatus | Action::ViewStats => {
            Err(forbidden("Access denied"))
        }
    }
}

/// Reporter filter applied to report listings: citizens only see their own
pub fn report_owner_scope(actor: &AuthenticatedUser) -> Option<Uuid> {
    if actor.is_staff() {
        None
    } else {
        Some(actor.id)
    }
}

fn forbidden(message: &str) -> AppError {
    AppError::Forbidden(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{admin_user, citizen_user, official_user};

    fn report(owner_id: Uuid, status: ReportStatus) -> Resource {
        Resource::Report(ReportAccess { owner_id, status })
    }

    const EDIT_TEXT: Action = Action::Update {
        restricted_fields: false,
    };
    const EDIT_ALL: Action = Action::Update {
        restricted_fields: true,
    };
    const ACTIVE_ALERT: Resource = Resource::Alert { is_active: true };
    const INACTIVE_ALERT: Resource = Resource::Alert { is_active: false };

    #[test]
    fn test_staff_is_always_allowed() {
        let stranger = Uuid::now_v7();
        for actor in [admin_user(), official_user()] {
            for action in [
                Action::Read,
                EDIT_ALL,
                Action::Delete,
                Action::Comment,
                Action::ChangeStatus,
            ] {
                let resolved = report(stranger, ReportStatus::Resolved);
                assert!(authorize(&actor, action, resolved).is_ok());
            }
            assert!(authorize(&actor, Action::ViewStats, Resource::ReportCollection).is_ok());
            assert!(authorize(&actor, Action::Create, Resource::AlertCollection).is_ok());
            assert!(authorize(&actor, Action::Read, INACTIVE_ALERT).is_ok());
            assert!(authorize(&actor, Action::Delete, Resource::Schedule).is_ok());
        }
    }

    #[test]
    fn test_citizen_cannot_touch_other_reports() {
        let actor = citizen_user();
        let other = report(Uuid::now_v7(), ReportStatus::Pending);

        for action in [Action::Read, EDIT_TEXT, Action::Delete, Action::Comment] {
            assert!(matches!(
                authorize(&actor, action, other),
                Err(AppError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_citizen_edits_own_pending_report_text_only() {
        let actor = citizen_user();
        let own_pending = report(actor.id, ReportStatus::Pending);

        assert!(authorize(&actor, EDIT_TEXT, own_pending).is_ok());
        assert!(authorize(&actor, EDIT_ALL, own_pending).is_err());
        assert!(authorize(&actor, Action::Delete, own_pending).is_ok());
        assert!(authorize(&actor, Action::Read, own_pending).is_ok());
        assert!(authorize(&actor, Action::Comment, own_pending).is_ok());
    }

    #[test]
    fn test_citizen_locked_out_once_report_leaves_pending() {
        let actor = citizen_user();
        for status in [
            ReportStatus::Assigned,
            ReportStatus::InProgress,
            ReportStatus::Resolved,
            ReportStatus::Closed,
            ReportStatus::Rejected,
        ] {
            let own = report(actor.id, status);
            assert!(authorize(&actor, EDIT_TEXT, own).is_err());
            assert!(authorize(&actor, Action::Delete, own).is_err());
            // reading and commenting stay open
            assert!(authorize(&actor, Action::Read, own).is_ok());
            assert!(authorize(&actor, Action::Comment, own).is_ok());
        }
    }

    #[test]
    fn test_citizen_cannot_change_status_even_on_own_report() {
        let actor = citizen_user();
        let result = authorize(
            &actor,
            Action::ChangeStatus,
            report(actor.id, ReportStatus::Pending),
        );
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_citizen_report_collection_rules() {
        let actor = citizen_user();
        assert!(authorize(&actor, Action::Create, Resource::ReportCollection).is_ok());
        assert!(authorize(&actor, Action::Read, Resource::ReportCollection).is_ok());
        assert!(authorize(&actor, Action::ViewStats, Resource::ReportCollection).is_err());
    }

    #[test]
    fn test_citizen_alert_rules() {
        let actor = citizen_user();
        assert!(authorize(&actor, Action::Read, Resource::AlertCollection).is_ok());
        assert!(authorize(&actor, Action::Read, ACTIVE_ALERT).is_ok());
        assert!(authorize(&actor, Action::Read, INACTIVE_ALERT).is_err());
        assert!(authorize(&actor, Action::Create, Resource::AlertCollection).is_err());
        assert!(authorize(&actor, EDIT_ALL, ACTIVE_ALERT).is_err());
        assert!(authorize(&actor, Action::Delete, ACTIVE_ALERT).is_err());
        assert!(authorize(&actor, Action::ViewStats, ACTIVE_ALERT).is_err());
    }

    #[test]
    fn test_citizen_schedule_rules() {
        let actor = citizen_user();
        assert!(authorize(&actor, Action::Read, Resource::Schedule).is_ok());
        assert!(authorize(&actor, Action::Create, Resource::Schedule).is_err());
        assert!(authorize(&actor, EDIT_ALL, Resource::Schedule).is_err());
        assert!(authorize(&actor, Action::Delete, Resource::Schedule).is_err());
    }

    #[test]
    fn test_report_owner_scope() {
        let citizen = citizen_user();
        assert_eq!(report_owner_scope(&citizen), Some(citizen.id));
        assert_eq!(report_owner_scope(&admin_user()), None);
        assert_eq!(report_owner_scope(&official_user()), None);
    }
}
