//! Built-in collaborators.

use chrono::Utc;

use crate::ctcp::CtcpKind;
use crate::dispatch::{Context, Handler, HandlerResult};
use crate::message::{Message, MessageKind};

/// Answers the standard CTCP queries.
pub struct CtcpResponder {
    version: String,
}

impl CtcpResponder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Handler for CtcpResponder {
    fn name(&self) -> &str {
        "ctcp"
    }

    fn on_message(&mut self, ctx: &mut Context<'_>, msg: &mut Message) -> HandlerResult {
        if msg.kind != MessageKind::Ctcp || msg.source.nick.is_empty() {
            return Ok(());
        }
        let Some(ctcp) = msg.ctcp.clone() else {
            return Ok(());
        };

        let body = match ctcp.kind {
            CtcpKind::Version => self.version.clone(),
            CtcpKind::Ping => ctcp.body().to_string(),
            CtcpKind::Time => Utc::now().to_rfc2822(),
            CtcpKind::Clientinfo => "ACTION CLIENTINFO PING TIME VERSION".to_string(),
            _ => return Ok(()),
        };
        ctx.ctcp_reply(msg.nick(), ctcp.kind.as_str(), body);
        msg.mark_responded(format!("ctcp {}", ctcp.kind.as_str().to_ascii_lowercase()));
        Ok(())
    }
}

/// Joins a fixed set of channels after every registration.
pub struct AutoJoin {
    channels: Vec<String>,
}

impl AutoJoin {
    pub fn new(channels: Vec<String>) -> Self {
        Self { channels }
    }
}

impl Handler for AutoJoin {
    fn name(&self) -> &str {
        "autojoin"
    }

    fn on_connect(&mut self, ctx: &mut Context<'_>) -> HandlerResult {
        for channel in &self.channels {
            ctx.join(channel);
        }
        Ok(())
    }
}
