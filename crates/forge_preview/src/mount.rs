//! Ownership of the render target and the document's stylesheets.

use crate::outcome::Failure;
use crate::styling::StylingChoice;
use forge_dom::html::{render_nodes, render_page};
use forge_dom::{DomNode, MountTarget, StylesheetRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

pub const DEFAULT_TARGET: &str = "preview-root";

/// Run id handed out by [`PreviewMountManager::begin`]. Only the most
/// recent ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MountTicket(pub u64);

impl fmt::Display for MountTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What gets attached to the target.
#[derive(Debug, Clone, PartialEq)]
pub enum MountContent {
    Nodes(Vec<DomNode>),
    Failure(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    #[error("mount ticket {ticket} is stale; {latest} is the latest run")]
    Stale { ticket: MountTicket, latest: MountTicket },
}

#[derive(Debug)]
pub struct PreviewMountManager {
    target: MountTarget,
    stylesheets: StylesheetRegistry,
    latest: u64,
}

impl Default for PreviewMountManager {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

impl PreviewMountManager {
    pub fn new(target_name: &str) -> Self {
        Self {
            target: MountTarget::new(target_name),
            stylesheets: StylesheetRegistry::new(),
            latest: 0,
        }
    }

    pub fn target(&self) -> &MountTarget {
        &self.target
    }

    pub fn stylesheets(&self) -> &StylesheetRegistry {
        &self.stylesheets
    }

    pub fn latest(&self) -> MountTicket {
        MountTicket(self.latest)
    }

    /// Starts a run: issues the next ticket and detaches the previous output
    /// right away, so nothing stale stays visible while the run executes.
    pub fn begin(&mut self) -> MountTicket {
        self.latest += 1;
        self.target.clear();
        debug!(ticket = self.latest, "mount run started");
        MountTicket(self.latest)
    }

    /// Replaces the target's contents with `content`, injecting the styling's
    /// stylesheet first. Rejected when a later run has begun since `ticket`.
    pub fn mount(
        &mut self,
        ticket: MountTicket,
        content: MountContent,
        styling: &StylingChoice,
    ) -> Result<(), MountError> {
        if ticket.0 != self.latest {
            warn!(%ticket, latest = self.latest, "discarding stale mount");
            return Err(MountError::Stale {
                ticket,
                latest: self.latest(),
            });
        }

        self.target.clear();
        if let Some(locator) = &styling.locator {
            if self.stylesheets.inject(locator) {
                debug!(locator = %locator, "stylesheet injected");
            }
        }
        match content {
            MountContent::Nodes(nodes) => {
                for node in nodes {
                    self.target.append(node);
                }
            }
            MountContent::Failure(failure) => self.target.append(failure.panel()),
        }
        debug!(%ticket, children = self.target.children().len(), "mounted");
        Ok(())
    }

    /// HTML of the mounted panel only.
    pub fn panel_html(&self) -> String {
        render_nodes(self.target.children())
    }

    /// A standalone document with the injected stylesheets.
    pub fn page_html(&self, title: &str) -> String {
        render_page(title, &self.stylesheets, &self.target)
    }
}
