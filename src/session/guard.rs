use crate::auth::{Role, SessionState};
use std::fmt;

/// Outcome of checking a session against a view's allowed roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet; render nothing.
    Pending,
    RedirectToLogin,
    Allow,
}

pub fn allows(state: &SessionState, allowed_roles: &[Role]) -> bool {
    check(state, allowed_roles) == GuardDecision::Allow
}

pub fn check(state: &SessionState, allowed_roles: &[Role]) -> GuardDecision {
    match state {
        SessionState::Unresolved => GuardDecision::Pending,
        SessionState::Absent => GuardDecision::RedirectToLogin,
        SessionState::Present(session) if allowed_roles.contains(&session.role) => GuardDecision::Allow,
        SessionState::Present(_) => GuardDecision::RedirectToLogin,
    }
}

/// Views of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    PatientDashboard,
    DoctorDashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::PatientDashboard => "/patient-dashboard",
            Route::DoctorDashboard => "/doctor-dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        match path {
            "/" | "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/dashboard" => Some(Route::Dashboard),
            "/patient-dashboard" => Some(Route::PatientDashboard),
            "/doctor-dashboard" => Some(Route::DoctorDashboard),
            _ => None,
        }
    }

    /// Roles allowed on this view, or `None` for public views.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::PatientDashboard => Some(&[Role::Patient]),
            Route::DoctorDashboard => Some(&[Role::Doctor, Role::Admin]),
            Route::Login | Route::Register | Route::Dashboard => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Landing view for a signed-in role.
pub fn dashboard_for(role: Role) -> Route {
    match role {
        Role::Patient => Route::PatientDashboard,
        Role::Doctor | Role::Admin => Route::DoctorDashboard,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
    Wait,
}

/// Decides what navigating to `route` leads to under the given session.
pub fn navigate(state: &SessionState, route: Route) -> Navigation {
    if route == Route::Dashboard {
        return match state {
            SessionState::Unresolved => Navigation::Wait,
            SessionState::Absent => Navigation::Redirect(Route::Login),
            SessionState::Present(session) => Navigation::Redirect(dashboard_for(session.role)),
        };
    }

    let Some(roles) = route.allowed_roles() else {
        return Navigation::Render(route);
    };
    match check(state, roles) {
        GuardDecision::Allow => Navigation::Render(route),
        GuardDecision::Pending => Navigation::Wait,
        GuardDecision::RedirectToLogin => Navigation::Redirect(Route::Login),
    }
}
