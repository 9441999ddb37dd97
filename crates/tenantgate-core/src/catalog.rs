//! The default permission catalog.
//!
//! Bump [`CATALOG_VERSION`] whenever an entry is added. Entries are never
//! removed from this list; retire a permission by deactivating it.

use crate::models::permission::CreatePermission;

pub const CATALOG_VERSION: u32 = 3;

/// One row of the default catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: &'static str,
    pub module: &'static str,
    pub resource: &'static str,
    pub action: &'static str,
    pub scope: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    pub fn to_create(&self) -> CreatePermission {
        CreatePermission {
            code: self.code.into(),
            module: self.module.into(),
            resource: self.resource.into(),
            action: self.action.into(),
            scope: self.scope.into(),
            description: self.description.into(),
        }
    }
}

macro_rules! entry {
    ($code:literal, $module:literal, $resource:literal, $action:literal, $scope:literal, $desc:literal) => {
        CatalogEntry {
            code: $code,
            module: $module,
            resource: $resource,
            action: $action,
            scope: $scope,
            description: $desc,
        }
    };
}

pub static DEFAULT_PERMISSIONS: &[CatalogEntry] = &[
    // Employees
    entry!("employees.view", "employees", "employee", "view", "branch", "View employee records"),
    entry!("employees.manage", "employees", "employee", "manage", "branch", "Create and edit employee records"),
    entry!("employees.self_view", "employees", "employee", "self_view", "self", "View own employee record"),
    // Organization structure
    entry!("organization.view", "organization", "structure", "view", "company", "View branches and departments"),
    entry!("organization.manage", "organization", "structure", "manage", "company", "Edit branches and departments"),
    // Payroll
    entry!("payroll.view", "payroll", "payslip", "view", "branch", "View payroll runs and payslips"),
    entry!("payroll.manage", "payroll", "payroll_run", "manage", "company", "Prepare and edit payroll runs"),
    entry!("payroll.approve", "payroll", "payroll_run", "approve", "company", "Approve payroll runs for payment"),
    entry!("payroll.self_view", "payroll", "payslip", "self_view", "self", "View own payslips"),
    // Contracts
    entry!("contracts.view", "contracts", "contract", "view", "department", "View employment contracts"),
    entry!("contracts.manage", "contracts", "contract", "manage", "department", "Draft and amend contracts"),
    entry!("contracts.terminate", "contracts", "contract", "terminate", "company", "Terminate contracts"),
    // Attendance
    entry!("attendance.view", "attendance", "timesheet", "view", "department", "View attendance records"),
    entry!("attendance.manage", "attendance", "timesheet", "manage", "department", "Correct attendance records"),
    entry!("attendance.self_clock", "attendance", "timesheet", "self_clock", "self", "Clock in and out"),
    entry!("attendance.leave_approve", "attendance", "leave_request", "approve", "department", "Approve leave requests"),
    // Recruitment
    entry!("recruitment.view", "recruitment", "vacancy", "view", "company", "View vacancies and candidates"),
    entry!("recruitment.manage", "recruitment", "vacancy", "manage", "company", "Publish vacancies and manage candidates"),
    // Treasury
    entry!("treasury.view", "treasury", "payment", "view", "company", "View payment batches"),
    entry!("treasury.manage", "treasury", "payment", "manage", "company", "Prepare payment batches"),
    entry!("treasury.approve", "treasury", "payment", "approve", "company", "Release payment batches"),
    // Communications
    entry!("communications.view", "communications", "announcement", "view", "company", "Read announcements"),
    entry!("communications.send", "communications", "announcement", "send", "branch", "Send announcements"),
    // Access administration
    entry!("access.roles_view", "access", "role", "view", "company", "View roles and their permissions"),
    entry!("access.roles_manage", "access", "role", "manage", "company", "Create and edit roles"),
    entry!("access.assignments_manage", "access", "assignment", "manage", "company", "Assign roles to delegates"),
    entry!("access.overrides_manage", "access", "override", "manage", "company", "Set per-user permission overrides"),
    entry!("access.audit_view", "access", "audit_log", "view", "company", "Read the access audit log"),
];

/// Permission pairs a single role may only hold when it carries the
/// `allow_high_risk_combination` flag.
pub static HIGH_RISK_COMBINATIONS: &[(&str, &str)] = &[
    ("payroll.manage", "payroll.approve"),
    ("treasury.manage", "treasury.approve"),
    ("payroll.manage", "treasury.approve"),
];

/// The first high-risk pair completed by adding `candidate` to `held`.
pub fn high_risk_conflict<'a, I>(held: I, candidate: &str) -> Option<(&'static str, &'static str)>
where
    I: IntoIterator<Item = &'a str>,
{
    let held: Vec<&str> = held.into_iter().collect();
    HIGH_RISK_COMBINATIONS.iter().copied().find(|(a, b)| {
        (candidate == *a && held.contains(b)) || (candidate == *b && held.contains(a))
    })
}
