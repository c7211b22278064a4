//! Active alert investigation for Grafana.
//!
//! Lists the alerts Grafana is currently firing, joins each one to the rule
//! that produced it, and on request asks the Grafana LLM app to classify the
//! alert and suggest root causes and remediation.
//!
//! - [`correlate`] resolves rule, query, threshold, and display name per alert
//! - [`investigate`] builds the prompt and normalizes the model's answer
//! - [`GrafanaClient`] talks to the Grafana HTTP API
//! - [`Dashboard`] owns the view state and sequences refreshes and investigations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use alert_investigator::{Dashboard, GrafanaClient, Investigator};
//!
//! # async fn example() -> alert_investigator::Result<()> {
//! let client = Arc::new(GrafanaClient::from_env()?);
//! let dashboard = Dashboard::new(client.clone(), Investigator::new(client));
//!
//! dashboard.refresh().await;
//! for row in dashboard.rows().await {
//!     println!("{} {}", row.display_name, row.query);
//! }
//! let _result = dashboard.investigate(0).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `GRAFANA_URL`: Grafana base URL (default `http://localhost:3000`)
//! - `GRAFANA_API_TOKEN`: service account token
//! - `GRAFANA_TIMEOUT_SECS`: request timeout (default 60)
//! - `GRAFANA_LLM_MODEL`: model passed to the LLM app (default `base`)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod correlate;
pub mod error;
pub mod grafana;
pub mod investigate;
pub mod provider;
pub mod types;
pub mod ui;
pub mod view;

pub use config::GrafanaConfig;
pub use correlate::{correlate, display_name, resolve_query, resolve_rule, resolve_threshold, AlertRow};
pub use error::{InvestigatorError, Result};
pub use grafana::GrafanaClient;
pub use investigate::{build_prompt, normalize_content, pair_rows, strip_code_fences, Investigator};
pub use provider::{AlertSource, ChatMessage, ChatRole, CompletionProvider};
pub use types::{
    ActiveAlert, AlertRule, AlertStatus, Classification, InvestigationResult, RuleModel, RuleQuery,
    Severity, Snapshot,
};
pub use view::{Dashboard, ViewState};
