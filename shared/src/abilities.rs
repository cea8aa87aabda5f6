//! Role-based abilities
//!
//! Computes what a user may do from their role. Every check here is a pure
//! predicate: a denial is reported as `false` and callers turn it into one
//! of the [`PermissionError`] variants.
//!
//! Rules are evaluated last-to-first and the first rule that matches wins,
//! so a `cannot` declared after a broad `can` carves out an exception.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Actor, Role};

/// Staff may edit their own stock transactions for this long after creation
pub const TRANSACTION_EDIT_WINDOW_HOURS: i64 = 24;

/// Inventory item fields staff may never change
pub const STAFF_RESTRICTED_ITEM_FIELDS: &[&str] =
    &["cost_per_unit", "supplier_id", "restaurant_id"];

/// Stock transaction fields staff may change
pub const STAFF_TRANSACTION_FIELDS: &[&str] = &["quantity", "notes", "reason"];

/// Alert fields staff may change
pub const STAFF_ALERT_FIELDS: &[&str] = &["is_read"];

/// Actions a rule can grant or deny
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Wildcard covering every other action
    Manage,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
    ];

    fn covers(self, requested: Action) -> bool {
        self == Action::Manage || self == requested
    }
}

/// Things a rule can be about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    InventoryItem,
    Supplier,
    StockTransaction,
    Alert,
    Restaurant,
    AuditLog,
    UserProfile,
    Recipe,
    Sale,
    /// Wildcard covering every other subject
    #[serde(rename = "all")]
    All,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::InventoryItem,
        Subject::Supplier,
        Subject::StockTransaction,
        Subject::Alert,
        Subject::Restaurant,
        Subject::AuditLog,
        Subject::UserProfile,
        Subject::Recipe,
        Subject::Sale,
        Subject::All,
    ];

    fn covers(self, requested: Subject) -> bool {
        self == Subject::All || self == requested
    }
}

/// A single grant (`can`) or denial (`cannot`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub action: Action,
    pub subject: Subject,
    /// When set, the rule only concerns these fields
    pub fields: Option<&'static [&'static str]>,
    pub inverted: bool,
}

impl Rule {
    fn matches(&self, action: Action, subject: Subject) -> bool {
        self.action.covers(action) && self.subject.covers(subject)
    }

    // A field-scoped grant still answers "may I update this subject at all";
    // a field-scoped denial only blocks the fields it names.
    fn matches_field(&self, field: Option<&str>) -> bool {
        match (self.fields, field) {
            (None, _) => true,
            (Some(_), None) => !self.inverted,
            (Some(fields), Some(field)) => fields.contains(&field),
        }
    }
}

/// The set of rules computed for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ability {
    rules: Vec<Rule>,
}

impl Ability {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// True for the ability of an unauthenticated caller
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn can(&self, action: Action, subject: Subject) -> bool {
        self.check(action, subject, None)
    }

    pub fn cannot(&self, action: Action, subject: Subject) -> bool {
        !self.can(action, subject)
    }

    /// Check a single field of a subject
    pub fn can_field(&self, action: Action, subject: Subject, field: &str) -> bool {
        self.check(action, subject, Some(field))
    }

    fn check(&self, action: Action, subject: Subject, field: Option<&str>) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(action, subject) && rule.matches_field(field))
            .map(|rule| !rule.inverted)
            .unwrap_or(false)
    }
}

/// Accumulates rules in declaration order
#[derive(Debug, Default)]
pub struct AbilityBuilder {
    rules: Vec<Rule>,
}

impl AbilityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can(&mut self, actions: &[Action], subject: Subject) -> &mut Self {
        self.push(actions, subject, None, false)
    }

    pub fn can_fields(
        &mut self,
        actions: &[Action],
        subject: Subject,
        fields: &'static [&'static str],
    ) -> &mut Self {
        self.push(actions, subject, Some(fields), false)
    }

    pub fn cannot(&mut self, actions: &[Action], subject: Subject) -> &mut Self {
        self.push(actions, subject, None, true)
    }

    fn push(
        &mut self,
        actions: &[Action],
        subject: Subject,
        fields: Option<&'static [&'static str]>,
        inverted: bool,
    ) -> &mut Self {
        for &action in actions {
            self.rules.push(Rule {
                action,
                subject,
                fields,
                inverted,
            });
        }
        self
    }

    pub fn build(self) -> Ability {
        Ability { rules: self.rules }
    }
}

/// Compute the ability set for a user; `None` yields an empty set that denies everything
pub fn define_abilities_for<A: Actor + ?Sized>(user: Option<&A>) -> Ability {
    let mut builder = AbilityBuilder::new();

    let Some(user) = user else {
        return builder.build();
    };

    match user.role() {
        Role::Manager => {
            builder.can(&[Action::Manage], Subject::All);
            builder.cannot(
                &[Action::Create, Action::Update, Action::Delete],
                Subject::AuditLog,
            );
        }
        Role::Staff => {
            builder
                .can(&[Action::Read], Subject::InventoryItem)
                .can(&[Action::Read], Subject::Supplier)
                .can(&[Action::Read], Subject::Alert)
                .can(&[Action::Read], Subject::StockTransaction)
                .can(&[Action::Create, Action::Update], Subject::InventoryItem)
                .can(&[Action::Create, Action::Update], Subject::StockTransaction)
                .can_fields(&[Action::Update], Subject::Alert, STAFF_ALERT_FIELDS)
                .can(
                    &[Action::Read, Action::Create, Action::Update],
                    Subject::Recipe,
                )
                .can(&[Action::Read, Action::Create, Action::Update], Subject::Sale)
                .cannot(
                    &[Action::Create, Action::Update, Action::Delete],
                    Subject::Supplier,
                )
                .cannot(&[Action::Manage], Subject::AuditLog)
                .cannot(
                    &[Action::Create, Action::Update, Action::Delete],
                    Subject::Restaurant,
                )
                .cannot(
                    &[Action::Create, Action::Update, Action::Delete],
                    Subject::UserProfile,
                );
        }
    }

    builder.build()
}

/// Field-level check layered over the coarse update grant.
///
/// Managers may update any field. Staff are limited per subject; subjects
/// without a staff field policy are denied.
pub fn can_update_fields<A: Actor + ?Sized, F: AsRef<str>>(
    user: Option<&A>,
    subject: Subject,
    fields: &[F],
) -> bool {
    let Some(user) = user else {
        return false;
    };

    match user.role() {
        Role::Manager => true,
        Role::Staff => match subject {
            Subject::InventoryItem => !fields
                .iter()
                .any(|f| STAFF_RESTRICTED_ITEM_FIELDS.contains(&f.as_ref())),
            Subject::StockTransaction => fields
                .iter()
                .all(|f| STAFF_TRANSACTION_FIELDS.contains(&f.as_ref())),
            Subject::Alert => fields
                .iter()
                .all(|f| STAFF_ALERT_FIELDS.contains(&f.as_ref())),
            Subject::Supplier
            | Subject::Restaurant
            | Subject::AuditLog
            | Subject::UserProfile
            | Subject::Recipe
            | Subject::Sale
            | Subject::All => false,
        },
    }
}

/// Whether the user may still edit a transaction created at `transaction_date`
pub fn can_update_transaction<A: Actor + ?Sized>(
    user: Option<&A>,
    transaction_date: DateTime<Utc>,
) -> bool {
    can_update_transaction_at(user, transaction_date, Utc::now())
}

/// [`can_update_transaction`] against an explicit clock
pub fn can_update_transaction_at<A: Actor + ?Sized>(
    user: Option<&A>,
    transaction_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    let Some(user) = user else {
        return false;
    };

    match user.role() {
        Role::Manager => true,
        Role::Staff => now - transaction_date <= Duration::hours(TRANSACTION_EDIT_WINDOW_HOURS),
    }
}

/// Tenant isolation check
pub fn can_access_restaurant<A: Actor + ?Sized>(user: Option<&A>, restaurant_id: Uuid) -> bool {
    user.map(|u| u.restaurant_id() == restaurant_id)
        .unwrap_or(false)
}

/// The fixed set of permission failures reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionError {
    #[error("You must be logged in to perform this action")]
    Unauthorized,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("Only managers can perform this action")]
    ManagerOnly,
    #[error("You do not have permission to modify these fields")]
    RestrictedFields,
    #[error("Transactions older than 24 hours can only be modified by managers")]
    TransactionTooOld,
    #[error("You cannot access data from another restaurant")]
    WrongRestaurant,
    #[error("Audit logs are read-only")]
    AuditLogReadonly,
}

impl PermissionError {
    pub fn code(&self) -> &'static str {
        match self {
            PermissionError::Unauthorized => "UNAUTHORIZED",
            PermissionError::Forbidden => "FORBIDDEN",
            PermissionError::ManagerOnly => "MANAGER_ONLY",
            PermissionError::RestrictedFields => "RESTRICTED_FIELDS",
            PermissionError::TransactionTooOld => "TRANSACTION_TOO_OLD",
            PermissionError::WrongRestaurant => "WRONG_RESTAURANT",
            PermissionError::AuditLogReadonly => "AUDIT_LOG_READONLY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            email: "cook@example.com".to_string(),
            full_name: "Line Cook".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn no_user_gets_nothing() {
        let ability = define_abilities_for::<User>(None);
        assert!(ability.is_empty());
        for action in Action::ALL {
            for subject in Subject::ALL {
                assert!(!ability.can(action, subject), "{action:?} {subject:?}");
            }
        }
    }

    #[test]
    fn manager_manages_everything_but_audit_log_writes() {
        let manager = user(Role::Manager);
        let ability = define_abilities_for(Some(&manager));

        assert!(ability.can(Action::Delete, Subject::InventoryItem));
        assert!(ability.can(Action::Delete, Subject::Supplier));
        assert!(ability.can(Action::Update, Subject::UserProfile));
        assert!(ability.can(Action::Read, Subject::AuditLog));
        assert!(ability.cannot(Action::Create, Subject::AuditLog));
        assert!(ability.cannot(Action::Update, Subject::AuditLog));
        assert!(ability.cannot(Action::Delete, Subject::AuditLog));
    }

    #[test]
    fn staff_grants() {
        let staff = user(Role::Staff);
        let ability = define_abilities_for(Some(&staff));

        assert!(ability.can(Action::Read, Subject::InventoryItem));
        assert!(ability.can(Action::Create, Subject::InventoryItem));
        assert!(ability.can(Action::Update, Subject::InventoryItem));
        assert!(ability.cannot(Action::Delete, Subject::InventoryItem));

        assert!(ability.can(Action::Create, Subject::StockTransaction));
        assert!(ability.cannot(Action::Delete, Subject::StockTransaction));

        assert!(ability.can(Action::Read, Subject::Supplier));
        assert!(ability.cannot(Action::Create, Subject::Supplier));
        assert!(ability.cannot(Action::Delete, Subject::Supplier));

        assert!(ability.can(Action::Create, Subject::Sale));
        assert!(ability.cannot(Action::Delete, Subject::Sale));
        assert!(ability.can(Action::Update, Subject::Recipe));
        assert!(ability.cannot(Action::Delete, Subject::Recipe));

        assert!(ability.cannot(Action::Read, Subject::AuditLog));
        assert!(ability.cannot(Action::Update, Subject::Restaurant));
        assert!(ability.cannot(Action::Update, Subject::UserProfile));
    }

    #[test]
    fn staff_alert_update_is_field_scoped() {
        let staff = user(Role::Staff);
        let ability = define_abilities_for(Some(&staff));

        assert!(ability.can(Action::Update, Subject::Alert));
        assert!(ability.can_field(Action::Update, Subject::Alert, "is_read"));
        assert!(!ability.can_field(Action::Update, Subject::Alert, "message"));
        assert!(ability.cannot(Action::Delete, Subject::Alert));
    }

    #[test]
    fn later_rules_override_earlier_ones() {
        let mut builder = AbilityBuilder::new();
        builder
            .can(&[Action::Manage], Subject::All)
            .cannot(&[Action::Delete], Subject::Sale);
        let ability = builder.build();

        assert!(ability.can(Action::Update, Subject::Sale));
        assert!(ability.cannot(Action::Delete, Subject::Sale));
    }

    #[test]
    fn staff_field_restrictions() {
        let staff = user(Role::Staff);
        let s = Some(&staff);

        assert!(!can_update_fields(s, Subject::InventoryItem, &["cost_per_unit"]));
        assert!(!can_update_fields(s, Subject::InventoryItem, &["name", "supplier_id"]));
        assert!(can_update_fields(s, Subject::InventoryItem, &["name"]));
        assert!(can_update_fields(s, Subject::InventoryItem, &["current_stock", "min_threshold"]));

        assert!(can_update_fields(s, Subject::StockTransaction, &["quantity", "notes"]));
        assert!(!can_update_fields(s, Subject::StockTransaction, &["item_id"]));

        assert!(can_update_fields(s, Subject::Alert, &["is_read"]));
        assert!(!can_update_fields(s, Subject::Alert, &["is_read", "message"]));

        assert!(!can_update_fields(s, Subject::Supplier, &["name"]));
        assert!(!can_update_fields(s, Subject::Recipe, &["name"]));
    }

    #[test]
    fn manager_may_update_any_field() {
        let manager = user(Role::Manager);
        assert!(can_update_fields(Some(&manager), Subject::InventoryItem, &["cost_per_unit"]));
        assert!(can_update_fields(Some(&manager), Subject::Supplier, &["anything"]));
        assert!(!can_update_fields::<User, &str>(None, Subject::Alert, &["is_read"]));
    }

    #[test]
    fn transaction_edit_window() {
        let staff = user(Role::Staff);
        let manager = user(Role::Manager);
        let now = Utc::now();

        let at_boundary = now - Duration::hours(24);
        let just_past = at_boundary - Duration::seconds(1);

        assert!(can_update_transaction_at(Some(&staff), at_boundary, now));
        assert!(!can_update_transaction_at(Some(&staff), just_past, now));
        assert!(can_update_transaction_at(Some(&manager), just_past, now));
        assert!(!can_update_transaction_at::<User>(None, now, now));
    }

    #[test]
    fn restaurant_isolation() {
        let staff = user(Role::Staff);
        assert!(can_access_restaurant(Some(&staff), staff.restaurant_id));
        assert!(!can_access_restaurant(Some(&staff), Uuid::new_v4()));
        assert!(!can_access_restaurant::<User>(None, staff.restaurant_id));
    }

    #[test]
    fn permission_error_codes() {
        assert_eq!(PermissionError::TransactionTooOld.code(), "TRANSACTION_TOO_OLD");
        assert_eq!(
            serde_json::to_value(PermissionError::AuditLogReadonly).unwrap(),
            "AUDIT_LOG_READONLY"
        );
    }
}
