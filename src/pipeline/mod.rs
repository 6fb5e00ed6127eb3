//
//  mod.rs
//  RouteLens
//
//  Orchestration: routes file -> endpoints -> payloads, and payload ->
//  reviewer -> normalized insight. Per-endpoint failures are collected,
//  never propagated past the batch.
//

mod resolve;

pub use resolve::{controller_prefix, find_controller, resolve_controller, ResolvedController};

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::config::RouteLensConfig;
use crate::error::{Result, RouteLensError};
use crate::genai::{AnalyzeOptions, InsightProvider};
use crate::locator::{locate, locate_in_file};
use crate::normalizer::{NormalizedInsight, Normalizer};
use crate::payload::{build_payload, AnalysisPayload};
use crate::reflector::{controller_imports, scan_file_source, Endpoint, ScanReport};
use crate::refiner::Refiner;
use crate::sanitizer::Sanitizer;

/// Result for one endpoint of a routes file.
#[derive(Debug)]
pub struct EndpointOutcome {
    pub endpoint: Endpoint,
    pub controller: Option<PathBuf>,
    pub result: Result<AnalysisPayload>,
}

/// Everything produced from one routes file.
#[derive(Debug)]
pub struct RouteAnalysis {
    pub routes_file: PathBuf,
    pub report: ScanReport,
    pub outcomes: Vec<EndpointOutcome>,
}

impl RouteAnalysis {
    pub fn payloads(&self) -> impl Iterator<Item = &AnalysisPayload> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Endpoint, &RouteLensError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.endpoint, e)))
    }
}

pub struct Pipeline {
    config: RouteLensConfig,
    project_root: PathBuf,
    refiner: Refiner,
    sanitizer: Sanitizer,
}

impl Pipeline {
    pub fn new(config: RouteLensConfig, project_root: impl Into<PathBuf>) -> Self {
        let refiner = Refiner::new(&config.refiner);
        let sanitizer = Sanitizer::new(&config.sanitizer);
        Self {
            config,
            project_root: project_root.into(),
            refiner,
            sanitizer,
        }
    }

    pub fn config(&self) -> &RouteLensConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Scan a routes file on disk.
    pub fn scan_routes(&self, routes_file: &Path) -> Result<ScanReport> {
        let source = fs::read_to_string(routes_file)?;
        Ok(scan_file_source(
            routes_file,
            &source,
            &self.config.reflector.default_router,
        ))
    }

    /// Locate, refine, sanitize and package one handler from controller source.
    pub fn analyze_endpoint(
        &self,
        endpoint: &Endpoint,
        controller_src: &str,
        controller: Option<&Path>,
    ) -> Result<AnalysisPayload> {
        self.analyze_function(endpoint, &endpoint.handler, controller_src, controller)
    }

    fn analyze_function(
        &self,
        endpoint: &Endpoint,
        function: &str,
        source: &str,
        controller: Option<&Path>,
    ) -> Result<AnalysisPayload> {
        let extracted = match controller {
            Some(path) => locate_in_file(path, source, function)?,
            None => locate(source, function)?,
        }
        .ok_or_else(|| RouteLensError::NotFound(format!("handler '{function}'")))?;

        let refined = self
            .refiner
            .refine(Some(&extracted))
            .ok_or_else(|| RouteLensError::NotFound(format!("empty handler '{function}'")))?;
        let sanitized = self.sanitizer.sanitize(&refined.cleaned_code);

        info!(
            handler = %endpoint.handler,
            note = %sanitized.note,
            lines = refined.summary.line_count,
            "payload built"
        );
        Ok(build_payload(endpoint, &refined, &sanitized, controller))
    }

    /// Analyze every endpoint of a routes file, optionally restricted to the
    /// handlers in `only`. Endpoints are independent and run in parallel;
    /// only failing to read the routes file itself is an error.
    pub fn analyze_routes(&self, routes_file: &Path, only: &[String]) -> Result<RouteAnalysis> {
        let source = fs::read_to_string(routes_file)?;
        let report = scan_file_source(routes_file, &source, &self.config.reflector.default_router);
        if report.is_empty() {
            warn!(file = %routes_file.display(), "no endpoints found");
        }
        let imports = controller_imports(&source);

        let endpoints: Vec<Endpoint> = report
            .endpoints()
            .into_iter()
            .filter(|e| only.is_empty() || only.iter().any(|h| *h == e.handler))
            .collect();

        let outcomes = endpoints
            .into_par_iter()
            .map(|endpoint| {
                let resolved =
                    resolve_controller(&self.project_root, routes_file, &endpoint.handler, &imports);
                let result = match &resolved {
                    Some(r) => fs::read_to_string(&r.path)
                        .map_err(RouteLensError::from)
                        .and_then(|src| {
                            self.analyze_function(&endpoint, &r.function, &src, Some(&r.path))
                        }),
                    None => Err(RouteLensError::NotFound(format!(
                        "controller for '{}'",
                        endpoint.handler
                    ))),
                };
                match &result {
                    Err(e) if e.is_skippable() => {
                        warn!(endpoint = %endpoint.label(), error = %e, "endpoint skipped")
                    }
                    Err(e) => error!(endpoint = %endpoint.label(), error = %e, "endpoint failed"),
                    Ok(_) => {}
                }
                EndpointOutcome {
                    endpoint,
                    controller: resolved.map(|r| r.path),
                    result,
                }
            })
            .collect();

        Ok(RouteAnalysis {
            routes_file: routes_file.to_path_buf(),
            report,
            outcomes,
        })
    }
}

/// Send one payload to the reviewer and normalize what comes back. Provider
/// failures are errors; a bad reply is a failure insight, not an error.
pub fn review_payload(
    provider: &dyn InsightProvider,
    normalizer: &Normalizer,
    payload: &AnalysisPayload,
    options: &AnalyzeOptions,
) -> Result<NormalizedInsight> {
    let reply = provider.analyze(payload, options)?;
    Ok(normalizer.normalize(&reply.raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::ProviderReply;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const ROUTES: &str = r#"import express from "express";
import { getUsers, createUser as addUser } from "../controllers/user.controller.js";
import { ghost } from "../controllers/user.controller.js";

const router = express.Router();

router.get("/users", authorize, getUsers);
router.post("/users", addUser);
router.route("/users/:id").delete(ghost);

export default router;
"#;

    const CONTROLLER: &str = r#"export const getUsers = async (req, res) => {
  console.log("listing");
  const users = await User.find();
  res.json(users);
};

export function createUser(req, res) {
  const apiKey = "abc-123";
  res.status(201).send(apiKey);
}
"#;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("src/routes")).unwrap();
        fs::create_dir_all(root.join("src/controllers")).unwrap();
        fs::write(root.join("src/routes/user.routes.js"), ROUTES).unwrap();
        fs::write(root.join("src/controllers/user.controller.js"), CONTROLLER).unwrap();
        (dir, root)
    }

    #[test]
    fn test_analyze_endpoint_from_source() {
        let pipeline = Pipeline::new(RouteLensConfig::default(), ".");
        let endpoint = Endpoint {
            method: crate::reflector::HttpVerb::Get,
            path: "/users".into(),
            handler: "getUsers".into(),
        };
        let payload = pipeline.analyze_endpoint(&endpoint, CONTROLLER, None).unwrap();
        assert!(!payload.function.cleaned_code.contains("console.log"));
        assert!(payload.function.is_async);

        let missing = Endpoint {
            handler: "nope".into(),
            ..endpoint
        };
        assert!(matches!(
            pipeline.analyze_endpoint(&missing, CONTROLLER, None),
            Err(RouteLensError::NotFound(_))
        ));
    }

    #[test]
    fn test_analyze_routes_collects_failures() {
        let (_dir, root) = project();
        let pipeline = Pipeline::new(RouteLensConfig::default(), &root);
        let analysis = pipeline
            .analyze_routes(&root.join("src/routes/user.routes.js"), &[])
            .unwrap();

        assert_eq!(analysis.outcomes.len(), 3);
        let handlers: Vec<&str> = analysis.payloads().map(|p| p.endpoint.handler.as_str()).collect();
        assert_eq!(handlers, vec!["getUsers", "addUser"]);

        // aliased import is located under its exported name
        let add = analysis.payloads().find(|p| p.endpoint.handler == "addUser").unwrap();
        assert_eq!(add.function.name, "createUser");
        assert!(!add.function.sanitized_code.contains("abc-123"));

        let failed: Vec<&str> = analysis.failures().map(|(e, _)| e.handler.as_str()).collect();
        assert_eq!(failed, vec!["ghost"]);
    }

    #[test]
    fn test_only_filter() {
        let (_dir, root) = project();
        let pipeline = Pipeline::new(RouteLensConfig::default(), &root);
        let analysis = pipeline
            .analyze_routes(&root.join("src/routes/user.routes.js"), &["getUsers".to_string()])
            .unwrap();
        assert_eq!(analysis.outcomes.len(), 1);
        assert!(analysis.outcomes[0].result.is_ok());
    }

    #[test]
    fn test_missing_routes_file_is_error() {
        let pipeline = Pipeline::new(RouteLensConfig::default(), ".");
        assert!(matches!(
            pipeline.analyze_routes(Path::new("/no/such/routes.js"), &[]),
            Err(RouteLensError::Io(_))
        ));
    }

    struct CannedProvider {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    impl InsightProvider for CannedProvider {
        fn analyze(&self, payload: &AnalysisPayload, _options: &AnalyzeOptions) -> Result<ProviderReply> {
            self.seen.lock().unwrap().push(payload.endpoint.handler.clone());
            Ok(ProviderReply::from_raw(self.reply.clone()))
        }
    }

    struct DownProvider;

    impl InsightProvider for DownProvider {
        fn analyze(&self, _payload: &AnalysisPayload, _options: &AnalyzeOptions) -> Result<ProviderReply> {
            Err(RouteLensError::Provider("503".into()))
        }
    }

    #[test]
    fn test_review_payload() {
        let pipeline = Pipeline::new(RouteLensConfig::default(), ".");
        let endpoint = Endpoint {
            method: crate::reflector::HttpVerb::Get,
            path: "/users".into(),
            handler: "getUsers".into(),
        };
        let payload = pipeline.analyze_endpoint(&endpoint, CONTROLLER, None).unwrap();
        let provider = CannedProvider {
            reply: "```json\n{\"summary\": \"fine\", \"issues\": [\"n+1\"],}\n```".into(),
            seen: Mutex::new(Vec::new()),
        };
        let normalizer = Normalizer::default();

        let insight = review_payload(&provider, &normalizer, &payload, &AnalyzeOptions::default()).unwrap();
        assert_eq!(insight.as_insight().unwrap().summary, "fine");
        assert_eq!(*provider.seen.lock().unwrap(), vec!["getUsers"]);

        assert!(matches!(
            review_payload(&DownProvider, &normalizer, &payload, &AnalyzeOptions::default()),
            Err(RouteLensError::Provider(_))
        ));
    }
}
