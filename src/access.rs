//! Route guarding and navigation filtering. Both read the same role sets so
//! a page that is hidden from the menu is also refused on direct navigation.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::policy::{self, Role, RoleSet};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub path: String,
    #[serde(serialize_with = "serialize_role_ids")]
    pub allowed_roles: RoleSet,
}

impl Destination {
    pub fn new(path: &str, roles: &[Role]) -> Self {
        Self {
            path: path.to_string(),
            allowed_roles: roles.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    pub key: String,
    pub label: String,
    pub path: String,
    #[serde(serialize_with = "serialize_role_ids")]
    pub allowed_roles: RoleSet,
}

/// Wire shape for declaring destinations and nav entries. A nav entry may
/// omit `allowedRoles`; it then inherits the set of its destination.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccessEntry {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    pub path: String,
    #[serde(default)]
    pub allowed_roles: Option<Vec<i64>>,
}

fn serialize_role_ids<S: serde::Serializer>(roles: &RoleSet, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(roles.iter().map(|r| r.id()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    RedirectTo(String),
}

/// Decides whether `identity` may enter `destination`. Pure.
pub fn guard(destination: &Destination, identity: Option<&Identity>) -> GuardOutcome {
    let Some(identity) = identity else {
        return GuardOutcome::RedirectTo(LOGIN_PATH.to_string());
    };
    if !policy::allows(&destination.allowed_roles, identity.role) {
        return GuardOutcome::RedirectTo(UNAUTHORIZED_PATH.to_string());
    }
    GuardOutcome::Allow
}

/// Entries visible to `identity`, in declaration order.
pub fn visible_entries<'a>(entries: &'a [NavEntry], identity: Option<&Identity>) -> Vec<&'a NavEntry> {
    let Some(identity) = identity else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|e| policy::allows(&e.allowed_roles, identity.role))
        .collect()
}

/// Destinations and menu entries declared by the composing application.
#[derive(Debug, Clone)]
pub struct AccessTable {
    routes: Vec<Destination>,
    nav: Vec<NavEntry>,
}

impl AccessTable {
    pub fn routes(&self) -> &[Destination] {
        &self.routes
    }

    pub fn nav(&self) -> &[NavEntry] {
        &self.nav
    }

    pub fn destination(&self, path: &str) -> Option<&Destination> {
        let path = normalize_path(path);
        self.routes.iter().find(|d| d.path == path)
    }

    /// Role set for a declared path; `None` when the path is not declared.
    pub fn allowed_roles(&self, path: &str) -> Option<&RoleSet> {
        self.destination(path).map(|d| &d.allowed_roles)
    }

    pub fn set_routes(&mut self, raw: Vec<RawAccessEntry>) -> Result<(), String> {
        let mut routes = Vec::with_capacity(raw.len());
        for r in raw {
            let path = normalize_path(&r.path);
            if path.is_empty() {
                return Err("route path must not be empty".into());
            }
            if routes.iter().any(|d: &Destination| d.path == path) {
                return Err(format!("duplicate route: {}", path));
            }
            routes.push(Destination {
                path,
                allowed_roles: policy::parse_role_ids(r.allowed_roles.as_deref().unwrap_or(&[]))?,
            });
        }
        self.routes = routes;
        self.sync_nav();
        Ok(())
    }

    /// Replaces the menu. Every entry must point at a declared route and
    /// takes its role set from that route.
    pub fn set_nav(&mut self, raw: Vec<RawAccessEntry>) -> Result<(), String> {
        let mut nav = Vec::with_capacity(raw.len());
        for r in raw {
            let Some(destination) = self.destination(&r.path) else {
                return Err(format!("nav entry points at undeclared route: {}", r.path.trim()));
            };
            if let Some(ids) = &r.allowed_roles {
                if policy::parse_role_ids(ids)? != destination.allowed_roles {
                    return Err(format!(
                        "nav roles for {} differ from the route's roles",
                        destination.path
                    ));
                }
            }
            let path = destination.path.clone();
            let allowed_roles = destination.allowed_roles.clone();
            let key = r.key.unwrap_or_else(|| path.trim_start_matches('/').to_string());
            let label = r.label.unwrap_or_else(|| key.clone());
            nav.push(NavEntry {
                key,
                label,
                path,
                allowed_roles,
            });
        }
        self.nav = nav;
        Ok(())
    }

    /// Drops menu entries whose route is gone and refreshes the rest.
    fn sync_nav(&mut self) {
        let routes = &self.routes;
        self.nav.retain_mut(|entry| {
            match routes.iter().find(|d| d.path == entry.path) {
                Some(d) => {
                    entry.allowed_roles = d.allowed_roles.clone();
                    true
                }
                None => false,
            }
        });
    }
}

impl Default for AccessTable {
    fn default() -> Self {
        use Role::*;
        let pages: [(&str, &str, &str, &[Role]); 11] = [
            ("dashboard", "Inicio", "/dashboard", &[]),
            ("information", "Información", "/information", &[]),
            ("students", "Alumnos", "/students", &[Administrator, Coordinator]),
            ("teachers", "Profesores", "/teachers", &[Administrator, Coordinator]),
            ("courses", "Cursos", "/courses", &[Administrator, Teacher, Coordinator]),
            ("tasks", "Tareas", "/tasks", &[Administrator, Teacher, Student, Coordinator]),
            ("grades", "Calificaciones", "/grades", &[Administrator, Teacher, Student, Coordinator]),
            ("notifications", "Avisos", "/notifications", &[Administrator, Coordinator]),
            ("reports", "Reportes", "/reports", &[Administrator, Teacher, Development, Coordinator]),
            ("users", "Usuarios", "/users", &[Administrator]),
            ("profile", "Mi perfil", "/profile", &[]),
        ];
        let routes = pages
            .iter()
            .map(|(_, _, path, roles)| Destination::new(path, roles))
            .collect();
        let nav = pages
            .iter()
            .map(|(key, label, path, roles)| NavEntry {
                key: key.to_string(),
                label: label.to_string(),
                path: path.to_string(),
                allowed_roles: roles.iter().copied().collect(),
            })
            .collect();
        Self { routes, nav }
    }
}

fn normalize_path(path: &str) -> String {
    let p = path.trim();
    let p = p.split(['?', '#']).next().unwrap_or("");
    if p.len() > 1 {
        p.trim_end_matches('/').to_string()
    } else {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NameParts;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: 1,
            email: "u@colegio.edu".into(),
            given_names: NameParts::default(),
            family_names: NameParts::default(),
            role,
            role_name: role.display_name().into(),
            token: "t".into(),
            has_token: true,
        }
    }

    #[test]
    fn guard_scenarios() {
        let students = Destination::new("/students", &[Role::Administrator, Role::Coordinator]);
        assert_eq!(
            guard(&students, Some(&identity(Role::Student))),
            GuardOutcome::RedirectTo("/unauthorized".into())
        );
        assert_eq!(
            guard(&students, None),
            GuardOutcome::RedirectTo("/login".into())
        );
        assert_eq!(
            guard(&students, Some(&identity(Role::Coordinator))),
            GuardOutcome::Allow
        );

        let information = Destination::new("/information", &[]);
        assert_eq!(
            guard(&information, Some(&identity(Role::Student))),
            GuardOutcome::Allow
        );
        assert_eq!(
            guard(&information, None),
            GuardOutcome::RedirectTo("/login".into())
        );
    }

    #[test]
    fn guard_is_repeatable() {
        let d = Destination::new("/users", &[Role::Administrator]);
        let who = identity(Role::Teacher);
        let first = guard(&d, Some(&who));
        for _ in 0..3 {
            assert_eq!(guard(&d, Some(&who)), first);
        }
    }

    #[test]
    fn nav_keeps_declaration_order_and_matches_guard() {
        let table = AccessTable::default();
        let student = identity(Role::Student);
        let keys: Vec<&str> = visible_entries(table.nav(), Some(&student))
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(
            keys,
            vec!["dashboard", "information", "tasks", "grades", "profile"]
        );

        assert_nav_matches_guard(&table);
    }

    #[test]
    fn nav_is_empty_without_identity() {
        let table = AccessTable::default();
        assert!(visible_entries(table.nav(), None).is_empty());
    }

    #[test]
    fn destination_lookup_normalizes_paths() {
        let table = AccessTable::default();
        assert!(table.destination("/students/").is_some());
        assert!(table.destination("/students?page=2").is_some());
        assert!(table.destination("/nowhere").is_none());
        assert_eq!(table.allowed_roles("/information").map(|r| r.len()), Some(0));
    }

    #[test]
    fn declared_tables_replace_defaults() {
        let mut table = AccessTable::default();
        let routes: Vec<RawAccessEntry> = serde_json::from_value(serde_json::json!([
            { "path": "/a", "allowedRoles": [1] },
            { "path": "/b" }
        ]))
        .expect("routes");
        table.set_routes(routes).expect("set routes");
        assert_eq!(table.routes().len(), 2);
        assert!(table.destination("/students").is_none());

        let bad: Vec<RawAccessEntry> =
            serde_json::from_value(serde_json::json!([{ "path": "/c", "allowedRoles": [8] }]))
                .expect("routes");
        assert!(table.set_routes(bad).is_err());
        assert_eq!(table.routes().len(), 2);

        let dup: Vec<RawAccessEntry> =
            serde_json::from_value(serde_json::json!([{ "path": "/x" }, { "path": "/x/" }]))
                .expect("routes");
        assert!(table.set_routes(dup).is_err());
    }

    fn entries(v: serde_json::Value) -> Vec<RawAccessEntry> {
        serde_json::from_value(v).expect("entries")
    }

    fn assert_nav_matches_guard(table: &AccessTable) {
        for role in Role::ALL {
            let who = identity(role);
            for entry in table.nav() {
                let dest = table.destination(&entry.path).expect("nav path declared");
                let shown = visible_entries(std::slice::from_ref(entry), Some(&who)).len() == 1;
                assert_eq!(shown, guard(dest, Some(&who)) == GuardOutcome::Allow, "{}", entry.path);
            }
        }
    }

    #[test]
    fn declared_nav_inherits_route_roles() {
        let mut table = AccessTable::default();
        table
            .set_nav(entries(serde_json::json!([{ "path": "/students" }, { "path": "/information" }])))
            .expect("set nav");

        let student = identity(Role::Student);
        let shown: Vec<&str> = visible_entries(table.nav(), Some(&student))
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(shown, vec!["/information"]);
        assert_nav_matches_guard(&table);
    }

    #[test]
    fn declared_nav_rejects_mismatched_roles_and_undeclared_paths() {
        let mut table = AccessTable::default();
        let widened = entries(serde_json::json!([{ "path": "/students", "allowedRoles": [3] }]));
        assert!(table.set_nav(widened).is_err());
        let opened = entries(serde_json::json!([{ "path": "/students", "allowedRoles": [] }]));
        assert!(table.set_nav(opened).is_err());
        let stray = entries(serde_json::json!([{ "path": "/audit" }]));
        assert!(table.set_nav(stray).is_err());
        assert_eq!(table.nav().len(), 11);

        let same = entries(serde_json::json!([{ "path": "/students/", "allowedRoles": [5, 1] }]));
        table.set_nav(same).expect("matching roles");
        assert_eq!(table.nav()[0].path, "/students");
    }

    #[test]
    fn routes_only_declaration_leaves_no_stale_nav() {
        let mut table = AccessTable::default();
        table
            .set_routes(entries(serde_json::json!([
                { "path": "/information" },
                { "path": "/grades", "allowedRoles": [1] }
            ])))
            .expect("set routes");

        let paths: Vec<&str> = table.nav().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/information", "/grades"]);
        for entry in table.nav() {
            assert!(table.destination(&entry.path).is_some());
        }
        let student = identity(Role::Student);
        assert_eq!(visible_entries(table.nav(), Some(&student)).len(), 1);
        assert_nav_matches_guard(&table);
    }
}
