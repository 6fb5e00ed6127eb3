//
//  mod.rs
//  RouteLens
//
//  Endpoint reflector. Walks a router file's AST and enumerates every
//  `<router>.<verb>(path, ...handlers)` and `<router>.route(path).<verb>(h)...`
//  registration. Best-effort: aliased routers, routers built in helper
//  functions, and handlers that aren't plain identifiers are not resolved
//  (they show up as skipped registrations instead).
//

mod imports;
mod router;

pub use imports::{controller_imports, ControllerImport};
pub use router::{detect_router, RouterBinding};

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::parser::helpers::{field_text, named_children, string_literal_value, walk_preorder, Visit};
use crate::parser::{parse_text, SupportedLanguage};

// ── Types ────────────────────────────────────────────────────────────────────

/// HTTP verbs a router registration may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Delete,
        HttpVerb::Patch,
        HttpVerb::Options,
        HttpVerb::Head,
    ];

    /// Parse a router method name. Case-sensitive: `router.GET` is not Express.
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            "options" => Some(Self::Options),
            "head" => Some(Self::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Options => "options",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared route registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: HttpVerb,
    pub path: String,
    /// Never empty.
    pub handler: String,
}

impl Endpoint {
    /// `GET /users → getUsers`
    pub fn label(&self) -> String {
        format!(
            "{} {} → {}",
            self.method.as_str().to_uppercase(),
            self.path,
            self.handler
        )
    }
}

/// Which registration shape produced an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationForm {
    /// `router.get("/x", mw, handler)`
    Direct,
    /// `router.route("/x").get(handler)`
    Chained,
}

/// An endpoint plus where it was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub endpoint: Endpoint,
    pub form: RegistrationForm,
    /// 1-based line of the verb call.
    pub line: usize,
    /// Byte offset of the verb name; the de-duplication key.
    pub offset: usize,
}

/// A call that looked like a registration but could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRegistration {
    pub method: HttpVerb,
    pub path: Option<String>,
    pub line: usize,
    pub reason: String,
}

/// Full result of scanning one router file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub router: RouterBinding,
    pub registrations: Vec<Registration>,
    pub skipped: Vec<SkippedRegistration>,
}

/// Tagged view of a scan that makes the heuristic's limits explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Matched(Vec<Endpoint>),
    /// Endpoints were found but something was assumed or left unresolved.
    Ambiguous {
        endpoints: Vec<Endpoint>,
        reasons: Vec<String>,
    },
    NotFound,
}

impl ScanReport {
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.registrations.iter().map(|r| r.endpoint.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn outcome(&self) -> ScanOutcome {
        let mut reasons: Vec<String> = self
            .skipped
            .iter()
            .map(|s| format!("line {}: {}", s.line, s.reason))
            .collect();

        if self.registrations.is_empty() {
            return if reasons.is_empty() {
                ScanOutcome::NotFound
            } else {
                ScanOutcome::Ambiguous {
                    endpoints: Vec::new(),
                    reasons,
                }
            };
        }

        if !self.router.detected {
            reasons.insert(
                0,
                format!("router identifier '{}' was assumed", self.router.name),
            );
        }

        if reasons.is_empty() {
            ScanOutcome::Matched(self.endpoints())
        } else {
            ScanOutcome::Ambiguous {
                endpoints: self.endpoints(),
                reasons,
            }
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Enumerate declared endpoints in router source text. Never fails; an empty
/// vector means nothing recognizable was found.
pub fn scan_endpoints(source: &str) -> Vec<Endpoint> {
    scan_report(source).endpoints()
}

/// Scan JavaScript router source with the conventional default router name.
pub fn scan_report(source: &str) -> ScanReport {
    scan_with(source, SupportedLanguage::JavaScript, router::DEFAULT_ROUTER)
}

/// Scan a router file, choosing the grammar from its extension.
pub fn scan_file_source(path: &Path, source: &str, default_router: &str) -> ScanReport {
    let lang = SupportedLanguage::from_path(path).unwrap_or_default();
    scan_with(source, lang, default_router)
}

/// Scan with an explicit grammar and fallback router identifier.
pub fn scan_with(source: &str, lang: SupportedLanguage, default_router: &str) -> ScanReport {
    let Some(tree) = parse_text(lang, source) else {
        return ScanReport {
            router: RouterBinding::assumed(default_router),
            registrations: Vec::new(),
            skipped: Vec::new(),
        };
    };
    let root = tree.root_node();
    let bytes = source.as_bytes();

    let router = detect_router(&root, bytes, default_router);

    let mut walker = RouteWalker {
        router: &router.name,
        source: bytes,
        direct: Vec::new(),
        chained: Vec::new(),
        skipped: Vec::new(),
        seen: HashSet::new(),
    };
    walker.walk(&root);

    let RouteWalker {
        direct,
        chained,
        skipped,
        ..
    } = walker;

    let mut registrations = direct;
    registrations.extend(chained);

    ScanReport {
        router,
        registrations,
        skipped,
    }
}

// ── Walker ───────────────────────────────────────────────────────────────────

struct RouteWalker<'a> {
    router: &'a str,
    source: &'a [u8],
    direct: Vec<Registration>,
    chained: Vec<Registration>,
    skipped: Vec<SkippedRegistration>,
    seen: HashSet<usize>,
}

impl<'a> RouteWalker<'a> {
    fn walk(&mut self, root: &Node) {
        walk_preorder(root, |node| {
            if node.kind() == "call_expression" {
                self.check_call(node);
            }
            Visit::Descend
        });
    }

    fn check_call(&mut self, call: &Node) {
        let Some(func) = call.child_by_field_name("function") else {
            return;
        };
        if func.kind() != "member_expression" {
            return;
        }
        let Some(object) = func.child_by_field_name("object") else {
            return;
        };
        if object.kind() != "identifier" || object.utf8_text(self.source).ok() != Some(self.router)
        {
            return;
        }
        let Some(method) = field_text(&func, "property", self.source) else {
            return;
        };

        if method == "route" {
            self.collect_chain(call);
        } else if let Some(verb) = HttpVerb::from_method(method) {
            self.collect_direct(call, &func, verb);
        }
    }

    /// `router.<verb>("/path", h1, ..., hN)`
    fn collect_direct(&mut self, call: &Node, func: &Node, verb: HttpVerb) {
        let line = call.start_position().row + 1;
        let Some(args) = call.child_by_field_name("arguments") else {
            return;
        };
        let args = named_children(&args);
        let Some(path) = args.first().and_then(|a| string_literal_value(a, self.source)) else {
            // router.get(someVar, ...) or router.get(): not a readable route declaration
            return;
        };

        match last_identifier(&args[1..], self.source) {
            Ok(handler) => {
                let offset = func
                    .child_by_field_name("property")
                    .map(|p| p.start_byte())
                    .unwrap_or_else(|| call.start_byte());
                if self.seen.insert(offset) {
                    self.direct.push(Registration {
                        endpoint: Endpoint {
                            method: verb,
                            path,
                            handler,
                        },
                        form: RegistrationForm::Direct,
                        line,
                        offset,
                    });
                }
            }
            Err(reason) => self.skipped.push(SkippedRegistration {
                method: verb,
                path: Some(path),
                line,
                reason,
            }),
        }
    }

    /// `router.route("/path").get(h).post(h)...`, one endpoint per link.
    fn collect_chain(&mut self, route_call: &Node) {
        let Some(args) = route_call.child_by_field_name("arguments") else {
            return;
        };
        let Some(path) = named_children(&args)
            .first()
            .and_then(|a| string_literal_value(a, self.source))
        else {
            return;
        };

        let mut current = *route_call;
        loop {
            // current → member_expression(.verb) → call_expression(args)
            let Some(member) = current.parent() else { break };
            if member.kind() != "member_expression" {
                break;
            }
            let Some(property) = member.child_by_field_name("property") else {
                break;
            };
            let Some(verb) = property
                .utf8_text(self.source)
                .ok()
                .and_then(HttpVerb::from_method)
            else {
                break;
            };
            let Some(link) = member.parent() else { break };
            if link.kind() != "call_expression" {
                break;
            }
            let line = link.start_position().row + 1;
            let Some(link_args) = link.child_by_field_name("arguments") else {
                break;
            };

            match last_identifier(&named_children(&link_args), self.source) {
                Ok(handler) => {
                    if self.seen.insert(property.start_byte()) {
                        self.chained.push(Registration {
                            endpoint: Endpoint {
                                method: verb,
                                path: path.clone(),
                                handler,
                            },
                            form: RegistrationForm::Chained,
                            line,
                            offset: property.start_byte(),
                        });
                    }
                }
                Err(reason) => {
                    self.skipped.push(SkippedRegistration {
                        method: verb,
                        path: Some(path.clone()),
                        line,
                        reason,
                    });
                    break;
                }
            }
            current = link;
        }
    }
}

/// The handler is the last argument; every argument must be a bare identifier
/// (middleware-before-handler convention).
fn last_identifier(args: &[Node], source: &[u8]) -> std::result::Result<String, String> {
    if args.is_empty() {
        return Err("no handler argument".to_string());
    }
    for arg in args {
        if arg.kind() != "identifier" {
            return Err(format!("handler argument is {} not an identifier", arg.kind()));
        }
    }
    let last = args[args.len() - 1];
    let name = last.utf8_text(source).unwrap_or("").trim().to_string();
    if name.is_empty() {
        return Err("empty handler name".to_string());
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(method: HttpVerb, path: &str, handler: &str) -> Endpoint {
        Endpoint {
            method,
            path: path.to_string(),
            handler: handler.to_string(),
        }
    }

    #[test]
    fn test_single_registration_with_middleware() {
        let endpoints = scan_endpoints("router.get('/users', authorize, getUsers)");
        assert_eq!(endpoints, vec![ep(HttpVerb::Get, "/users", "getUsers")]);
    }

    #[test]
    fn test_single_handler_argument() {
        let endpoints = scan_endpoints(r#"router.post("/users", createUser);"#);
        assert_eq!(endpoints, vec![ep(HttpVerb::Post, "/users", "createUser")]);
    }

    #[test]
    fn test_custom_router_name() {
        let src = r#"
import { Router } from "express";
const cardRouter = Router();
cardRouter.get(`/cards`, listCards);
cardRouter.delete("/cards/:id", auth, admin, removeCard);
router.get("/ignored", nope);
export default cardRouter;
"#;
        let report = scan_report(src);
        assert!(report.router.detected);
        assert_eq!(report.router.name, "cardRouter");
        assert_eq!(
            report.endpoints(),
            vec![
                ep(HttpVerb::Get, "/cards", "listCards"),
                ep(HttpVerb::Delete, "/cards/:id", "removeCard"),
            ]
        );
        assert_eq!(report.outcome(), ScanOutcome::Matched(report.endpoints()));
    }

    #[test]
    fn test_express_router_member_construction() {
        let src = r#"
const express = require("express");
const authRouter = express.Router();
authRouter.post("/login", login);
"#;
        let report = scan_report(src);
        assert_eq!(report.router.name, "authRouter");
        assert_eq!(report.endpoints(), vec![ep(HttpVerb::Post, "/login", "login")]);
    }

    #[test]
    fn test_chained_routes_share_path() {
        let src = r#"
router.route("/items").get(listItems).post(createItem).delete(purgeItems);
"#;
        let endpoints = scan_endpoints(src);
        assert_eq!(
            endpoints,
            vec![
                ep(HttpVerb::Get, "/items", "listItems"),
                ep(HttpVerb::Post, "/items", "createItem"),
                ep(HttpVerb::Delete, "/items", "purgeItems"),
            ]
        );
    }

    #[test]
    fn test_direct_forms_precede_chains() {
        let src = r#"
router.route("/a").get(chainA);
router.get("/b", directB);
router.route("/c").put(chainC);
router.patch("/d", directD);
"#;
        let handlers: Vec<_> = scan_endpoints(src).into_iter().map(|e| e.handler).collect();
        assert_eq!(handlers, vec!["directB", "directD", "chainA", "chainC"]);
    }

    #[test]
    fn test_duplicates_are_distinct() {
        let src = r#"
router.get("/x", first);
router.get("/x", second);
router.route("/x").get(third).get(fourth);
"#;
        let endpoints = scan_endpoints(src);
        assert_eq!(endpoints.len(), 4);
        assert!(endpoints.iter().all(|e| e.path == "/x" && e.method == HttpVerb::Get));
    }

    #[test]
    fn test_inline_handler_is_skipped_not_guessed() {
        let src = r#"
router.get("/health", (req, res) => res.send("ok"));
router.get("/users", getUsers);
"#;
        let report = scan_report(src);
        assert_eq!(report.endpoints(), vec![ep(HttpVerb::Get, "/users", "getUsers")]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path.as_deref(), Some("/health"));
        assert!(matches!(report.outcome(), ScanOutcome::Ambiguous { .. }));
    }

    #[test]
    fn test_unknown_verbs_and_other_objects_ignored() {
        let src = r#"
router.use("/api", apiRouter);
router.all("/x", everything);
app.get("/y", appHandler);
router.GET("/z", shouty);
"#;
        assert!(scan_endpoints(src).is_empty());
        assert_eq!(scan_report(src).outcome(), ScanOutcome::NotFound);
    }

    #[test]
    fn test_every_verb() {
        let src = HttpVerb::ALL
            .iter()
            .map(|v| format!("router.{v}(\"/{v}\", h_{v});\n"))
            .collect::<String>();
        let endpoints = scan_endpoints(&src);
        assert_eq!(endpoints.len(), 7);
        for (endpoint, verb) in endpoints.iter().zip(HttpVerb::ALL) {
            assert_eq!(endpoint.method, verb);
            assert_eq!(endpoint.handler, format!("h_{verb}"));
        }
    }

    #[test]
    fn test_garbage_is_total() {
        assert!(scan_endpoints("").is_empty());
        // only totality matters here; tree-sitter recovery decides what survives
        let _ = scan_endpoints("router.get(((( '/x' ,,, ");
        let _ = scan_endpoints("}}}{{{ router.route(");
        let _ = scan_report("const = Router(;; router.route('/x').get(").outcome();
    }

    #[test]
    fn test_unterminated_non_ascii_path_is_total() {
        let _ = scan_endpoints("router.get('/é\n, h)");
        let _ = scan_endpoints("router.route('/é\n).get(h)");
        let _ = scan_report("router.post(\"/ü😀\n, a, b)").outcome();

        let ok = scan_endpoints("router.get('/café', h)");
        assert_eq!(ok, vec![ep(HttpVerb::Get, "/café", "h")]);
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 10_000;
        let src = format!(
            "const router = Router();\nconst x = {}1{};\nrouter.get('/deep', h);",
            "[".repeat(depth),
            "]".repeat(depth)
        );
        let report = scan_report(&src);
        assert!(report.router.detected);
        assert_eq!(report.endpoints(), vec![ep(HttpVerb::Get, "/deep", "h")]);
    }

    #[test]
    fn test_assumed_router_is_ambiguous() {
        let report = scan_report("router.get('/users', getUsers)");
        assert!(!report.router.detected);
        match report.outcome() {
            ScanOutcome::Ambiguous { endpoints, reasons } => {
                assert_eq!(endpoints.len(), 1);
                assert!(reasons[0].contains("assumed"));
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_typescript_router() {
        let src = r#"
import { Router, Request, Response } from "express";
const api: Router = Router();
api.get("/ping", ping as any);
api.get("/users", getUsers);
"#;
        let report = scan_file_source(Path::new("api.routes.ts"), src, "router");
        assert_eq!(report.router.name, "api");
        assert_eq!(report.endpoints(), vec![ep(HttpVerb::Get, "/users", "getUsers")]);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_label() {
        assert_eq!(
            ep(HttpVerb::Get, "/users", "getUsers").label(),
            "GET /users → getUsers"
        );
    }
}
