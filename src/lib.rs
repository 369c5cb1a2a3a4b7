//! Triage Agent - an LLM-backed GitHub triage and fix bot.
//!
//! The listener consumes event envelopes, routes them through a declarative
//! table, and dispatches them to handlers that comment triage plans and PR
//! summaries or record merged PRs in a knowledge base. The fix pipeline turns
//! an issue into a branch, commits, and a pull request on demand.
//!
//! Every outbound GitHub call goes through [`retry::Executor`] via
//! [`github::GitHubGateway`].

pub mod best_effort;
pub mod config;
pub mod delay;
pub mod effects;
pub mod fix;
pub mod github;
pub mod knowledge;
pub mod listener;
pub mod llm;
pub mod retry;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
