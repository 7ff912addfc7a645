//! Backup orchestration.
//!
//! Drives a run end to end: workspace selection, member lookup, legacy
//! chat views, v3 conversations, then the archive writer. Requests are
//! strictly sequential.

use std::path::PathBuf;

use crate::domain::{
    AppError, BackupSummary, CaptureIssue, Conversation, ConversationKind, MemberDirectory,
    Result, Workspace,
};
use crate::infrastructure::{ApiClient, ClickUpEndpoints, Transport};

use super::context::{BackupContext, BackupOptions};
use super::discovery::ViewDiscovery;
use super::flattener::{Flattener, NoThreads, ThreadSource};
use super::paginator::{walk, PageWalker, WalkOutcome};
use super::parser::{parse_channel, parse_members, parse_workspace, view_conversation};
use super::writer::write_archive;

/// Where a finished run was written.
#[derive(Debug)]
pub struct BackupReport {
    pub run_dir: PathBuf,
    pub summary: BackupSummary,
}

/// Walks the replies endpoint of a v3 conversation.
struct ReplyWalker<'a, T> {
    client: &'a ApiClient<T>,
    endpoints: &'a ClickUpEndpoints,
    workspace_id: &'a str,
}

impl<T: Transport> ThreadSource for ReplyWalker<'_, T> {
    fn replies(&self, conversation: &Conversation, message_id: &str) -> WalkOutcome {
        let request = self
            .endpoints
            .replies(self.workspace_id, &conversation.id, message_id);
        walk(self.client, request)
    }
}

/// Picks the workspace to back up.
///
/// # Errors
/// Fails when `id` matches nothing, when there are no workspaces, or when
/// there are several and no `id` was given.
pub fn choose_workspace(mut workspaces: Vec<Workspace>, id: Option<&str>) -> Result<Workspace> {
    if workspaces.is_empty() {
        return Err(AppError::InvalidData {
            message: "No workspaces found. Check your API token.".into(),
        });
    }

    if let Some(id) = id {
        return workspaces
            .into_iter()
            .find(|w| w.id == id)
            .ok_or_else(|| AppError::InvalidData {
                message: format!("Workspace ID '{id}' not found"),
            });
    }

    if workspaces.len() == 1 {
        return Ok(workspaces.remove(0));
    }

    let listing = workspaces
        .iter()
        .map(|w| format!("{} (ID: {})", w.name, w.id))
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::Config {
        message: format!("Several workspaces available, pass --workspace-id. Available: {listing}"),
    })
}

/// Service backing up one workspace per run.
pub struct BackupService<T> {
    client: ApiClient<T>,
    endpoints: ClickUpEndpoints,
}

impl<T: Transport> BackupService<T> {
    /// Create a new service; endpoints follow the client's configuration.
    #[must_use]
    pub fn new(client: ApiClient<T>) -> Self {
        let endpoints = ClickUpEndpoints::new(client.config());
        Self { client, endpoints }
    }

    /// Workspaces the token can access.
    ///
    /// # Errors
    /// Returns error if the listing fails.
    pub fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let outcome = walk(&self.client, self.endpoints.teams());
        if let Some(err) = outcome.error {
            return Err(err);
        }
        Ok(outcome.items.iter().filter_map(parse_workspace).collect())
    }

    /// Member directory of a workspace; an empty directory when the
    /// lookup fails for a reason other than the token.
    fn fetch_members(
        &self,
        workspace: &Workspace,
        issues: &mut Vec<CaptureIssue>,
    ) -> Result<MemberDirectory> {
        match self
            .client
            .get_json(&self.endpoints.team_url(&workspace.id), &[])
        {
            Ok(body) => {
                let members = parse_members(&body);
                tracing::info!("Found {} member(s)", members.len());
                Ok(members)
            }
            Err(err) if err.aborts_run() => Err(err),
            Err(err) => {
                tracing::warn!("Member lookup failed, DM names will fall back to ids: {err}");
                issues.push(CaptureIssue {
                    resource: "workspace members".into(),
                    error: err.to_string(),
                });
                Ok(MemberDirectory::new())
            }
        }
    }

    /// Runs a complete backup and writes the archive.
    ///
    /// A token rejected mid-run still writes what was collected before it,
    /// with the rejection listed as an issue, and then fails the run.
    ///
    /// # Errors
    /// Returns error when the workspace cannot be selected, the token is
    /// rejected, or the archive cannot be written. Other failures are
    /// recorded in the summary.
    pub fn run(&self, options: BackupOptions) -> Result<BackupReport> {
        let workspace = choose_workspace(self.list_workspaces()?, options.workspace_id.as_deref())?;
        tracing::info!(id = %workspace.id, "Selected workspace: {}", workspace.name);

        let mut issues = Vec::new();
        let members = self.fetch_members(&workspace, &mut issues)?;

        let mut ctx = BackupContext::new(workspace, members, options);
        ctx.issues.append(&mut issues);

        let captured = self.capture(&mut ctx);
        if let Err(err) = &captured {
            ctx.issues.push(CaptureIssue {
                resource: "backup run".into(),
                error: err.to_string(),
            });
        }

        let run_dir = ctx.run_dir();
        let summary = write_archive(&run_dir, &ctx)?;

        match captured {
            Ok(()) => {
                tracing::info!(
                    path = %run_dir.display(),
                    complete = summary.is_complete(),
                    "Backup written"
                );
                Ok(BackupReport { run_dir, summary })
            }
            Err(err) => {
                tracing::warn!(
                    path = %run_dir.display(),
                    records = summary.totals.records,
                    "Run aborted, partial backup written"
                );
                Err(err)
            }
        }
    }

    fn capture(&self, ctx: &mut BackupContext) -> Result<()> {
        if ctx.options.include_legacy {
            self.backup_chat_views(ctx)?;
        }
        self.backup_conversations(ctx)
    }

    fn backup_chat_views(&self, ctx: &mut BackupContext) -> Result<()> {
        let views = ViewDiscovery::new(&self.client, &self.endpoints, &mut ctx.issues)
            .discover(&ctx.workspace.id)?;

        let flattener = Flattener::new(&ctx.members, false);
        for view in &views {
            tracing::info!("Backing up chat view {} ({})", view.view_name, view.location);
            let request = self.endpoints.view_comments(&view.view_id, &view.view_name);
            let resource = request.resource.clone();
            let comments = walk(&self.client, request).settle(&resource, &mut ctx.issues)?;

            let flattened = flattener.flatten(view_conversation(view), &comments, &NoThreads)?;
            ctx.exports.push(flattened.export);
        }
        Ok(())
    }

    /// Followed channels plus all DMs and group DMs, open and closed.
    fn list_conversations(&self, ctx: &mut BackupContext) -> Result<Vec<Conversation>> {
        let mut listing = WalkOutcome::default();
        for include_closed in [false, true] {
            let request = self.endpoints.channels(&ctx.workspace.id, include_closed);
            listing.extend_from(PageWalker::new(&self.client, request));
            tracing::info!(
                include_closed,
                "Fetched {} unique channels so far",
                listing.items.len()
            );
            if listing.error.as_ref().is_some_and(AppError::aborts_run) {
                break;
            }
        }
        let channels = listing.settle("channel listing", &mut ctx.issues)?;

        let conversations: Vec<Conversation> = channels
            .iter()
            .filter_map(|ch| parse_channel(ch, &ctx.members))
            .collect();

        for kind in [
            ConversationKind::Channel,
            ConversationKind::DirectMessage,
            ConversationKind::GroupDm,
            ConversationKind::Other,
        ] {
            let count = conversations.iter().filter(|c| c.kind == kind).count();
            tracing::info!("{kind}: {count}");
        }
        Ok(conversations)
    }

    fn backup_conversations(&self, ctx: &mut BackupContext) -> Result<()> {
        let conversations = self.list_conversations(ctx)?;
        let total = conversations.len();

        let threads = ReplyWalker {
            client: &self.client,
            endpoints: &self.endpoints,
            workspace_id: &ctx.workspace.id,
        };
        let flattener = Flattener::new(&ctx.members, ctx.options.include_replies);

        for (idx, conversation) in conversations.into_iter().enumerate() {
            tracing::info!(
                "[{}/{total}] {} ({})",
                idx + 1,
                conversation.name,
                conversation.kind
            );
            let request =
                self.endpoints
                    .messages(&ctx.workspace.id, &conversation.id, &conversation.name);
            let resource = request.resource.clone();
            let messages = walk(&self.client, request).settle(&resource, &mut ctx.issues)?;

            let flattened = flattener.flatten(conversation, &messages, &threads)?;
            ctx.issues.extend(flattened.issues);
            ctx.exports.push(flattened.export);
        }
        Ok(())
    }
}
