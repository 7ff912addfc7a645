//! Legacy chat view discovery.
//!
//! Chat views hang off spaces, folders and lists, so finding them means
//! walking the whole hierarchy of a workspace.

use serde_json::Value;

use crate::domain::{CaptureIssue, Result};
use crate::infrastructure::{ApiClient, ClickUpEndpoints, PageRequest, Transport, ViewParent};

use super::paginator::walk;
use super::parser::{is_chat_view, node_name, parse_chat_view, value_id, ChatViewRef};

/// Walks spaces → folders → lists of a workspace collecting chat views.
pub struct ViewDiscovery<'a, T> {
    client: &'a ApiClient<T>,
    endpoints: &'a ClickUpEndpoints,
    issues: &'a mut Vec<CaptureIssue>,
}

impl<'a, T: Transport> ViewDiscovery<'a, T> {
    pub fn new(
        client: &'a ApiClient<T>,
        endpoints: &'a ClickUpEndpoints,
        issues: &'a mut Vec<CaptureIssue>,
    ) -> Self {
        Self {
            client,
            endpoints,
            issues,
        }
    }

    fn list(&mut self, request: PageRequest) -> Result<Vec<Value>> {
        let resource = request.resource.clone();
        walk(self.client, request).settle(&resource, self.issues)
    }

    fn collect_views(
        &mut self,
        parent: ViewParent<'_>,
        location: &str,
        found: &mut Vec<ChatViewRef>,
    ) -> Result<()> {
        let request = self.endpoints.views(parent);
        let views = self.list(request)?;
        found.extend(
            views
                .iter()
                .filter(|v| is_chat_view(v))
                .filter_map(|v| parse_chat_view(v, location)),
        );
        Ok(())
    }

    fn collect_list_views(
        &mut self,
        lists: &[Value],
        prefix: &str,
        found: &mut Vec<ChatViewRef>,
    ) -> Result<()> {
        for list in lists {
            let Some(list_id) = list.get("id").and_then(value_id) else {
                continue;
            };
            let location = format!("{prefix} > List: {}", node_name(list));
            self.collect_views(ViewParent::List(&list_id), &location, found)?;
        }
        Ok(())
    }

    /// Every chat view in the workspace, in hierarchy order.
    ///
    /// Listings that fail are recorded as capture issues and skipped.
    ///
    /// # Errors
    /// Propagates an error that invalidates the whole run.
    pub fn discover(mut self, team_id: &str) -> Result<Vec<ChatViewRef>> {
        let mut found = Vec::new();
        let endpoints = self.endpoints;
        let spaces = self.list(endpoints.spaces(team_id))?;
        tracing::info!("Found {} space(s)", spaces.len());

        for space in &spaces {
            let Some(space_id) = space.get("id").and_then(value_id) else {
                continue;
            };
            let space_location = format!("Space: {}", node_name(space));
            tracing::info!("Scanning {space_location}");

            self.collect_views(ViewParent::Space(&space_id), &space_location, &mut found)?;

            let folders = self.list(endpoints.folders(&space_id))?;
            for folder in &folders {
                let Some(folder_id) = folder.get("id").and_then(value_id) else {
                    continue;
                };
                let folder_location = format!("{space_location} > Folder: {}", node_name(folder));
                self.collect_views(ViewParent::Folder(&folder_id), &folder_location, &mut found)?;

                let lists = self.list(endpoints.folder_lists(&folder_id))?;
                self.collect_list_views(&lists, &folder_location, &mut found)?;
            }

            let lists = self.list(endpoints.folderless_lists(&space_id))?;
            self.collect_list_views(&lists, &space_location, &mut found)?;
        }

        tracing::info!("Found {} chat view(s)", found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::infrastructure::testing::{fast_config, FixtureTransport};
    use crate::infrastructure::HttpResponse;

    const V2: &str = "https://api.test/v2";

    fn hierarchy() -> FixtureTransport {
        FixtureTransport::new()
            .json(&format!("{V2}/team/9/space"), &[], &json!({"spaces": [{"id": "s1", "name": "Eng"}]}))
            .json(
                &format!("{V2}/space/s1/view"),
                &[],
                &json!({"views": [{"id": "v1", "name": "Space chat", "type": "chat"}, {"id": "v0", "type": "board"}]}),
            )
            .json(&format!("{V2}/space/s1/folder"), &[], &json!({"folders": [{"id": "f1", "name": "Backend"}]}))
            .json(&format!("{V2}/folder/f1/view"), &[], &json!({"views": []}))
            .json(&format!("{V2}/folder/f1/list"), &[], &json!({"lists": [{"id": "l1", "name": "API"}]}))
            .json(&format!("{V2}/list/l1/view"), &[], &json!({"views": [{"id": "v2", "name": "API chat", "type": "chat"}]}))
            .json(&format!("{V2}/space/s1/list"), &[], &json!({"lists": [{"id": "l2", "name": "Loose"}]}))
            .json(&format!("{V2}/list/l2/view"), &[], &json!({"views": [{"id": "v3", "type": "chat"}]}))
    }

    #[test]
    fn test_discovers_views_at_every_level() {
        let transport = hierarchy();
        let client = ApiClient::new(&transport, fast_config());
        let endpoints = ClickUpEndpoints::new(&fast_config());
        let mut issues = Vec::new();

        let views = ViewDiscovery::new(&client, &endpoints, &mut issues)
            .discover("9")
            .unwrap();

        let found: Vec<_> = views
            .iter()
            .map(|v| (v.view_id.as_str(), v.location.as_str()))
            .collect();
        assert_eq!(
            found,
            [
                ("v1", "Space: Eng"),
                ("v2", "Space: Eng > Folder: Backend > List: API"),
                ("v3", "Space: Eng > List: Loose"),
            ]
        );
        assert_eq!(views[2].view_name, "Unnamed");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_failed_listing_is_recorded_and_skipped() {
        let transport = FixtureTransport::new()
            .json(&format!("{V2}/team/9/space"), &[], &json!({"spaces": [{"id": "s1", "name": "Eng"}]}))
            .json(&format!("{V2}/space/s1/view"), &[], &json!({"views": []}))
            .respond(&format!("{V2}/space/s1/folder"), &[], HttpResponse::status(403))
            .json(&format!("{V2}/space/s1/list"), &[], &json!({"lists": []}));
        let client = ApiClient::new(&transport, fast_config());
        let endpoints = ClickUpEndpoints::new(&fast_config());
        let mut issues = Vec::new();

        let views = ViewDiscovery::new(&client, &endpoints, &mut issues)
            .discover("9")
            .unwrap();

        assert!(views.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].resource, "folders of space s1");
    }
}
