//! GitHub Projects (v2) board client.
//!
//! The project node id, the `Status` single-select field and the due date
//! field (`End date`, else `Due`) are resolved once per client.
//! [`BoardReader::fetch_board`] also caches every item it returns: mutations
//! only receive item ids and look up kind and content id there.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use boardsync_core::config::RepoRef;
use boardsync_core::types::{Board, BoardItem, ContentKind, ItemId};
use boardsync_sync::{BoardReader, BoardWriter, FieldChange, NewItem, RemoteError};

use crate::queries;
use crate::transport::{HttpTransport, Transport};

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Nodes<T> {
    fn into_present(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OwnerData {
    #[serde(rename = "repositoryOwner")]
    owner: Option<OwnerNode>,
}

#[derive(Debug, Deserialize)]
struct OwnerNode {
    #[serde(rename = "projectV2")]
    project: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectNode {
    id: String,
    field: Option<StatusField>,
    end_date: Option<DateField>,
    due: Option<DateField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateField {
    id: Option<String>,
    data_type: Option<String>,
}

impl DateField {
    fn date_id(self) -> Option<String> {
        self.id.filter(|_| self.data_type.as_deref() == Some("DATE"))
    }
}

#[derive(Debug, Deserialize)]
struct StatusField {
    id: Option<String>,
    #[serde(default)]
    options: Vec<StatusOption>,
}

#[derive(Debug, Clone, Deserialize)]
struct StatusOption {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NodeData<T> {
    node: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ProjectItems {
    items: ItemsPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsPage {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<ItemNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    id: String,
    #[serde(default)]
    is_archived: bool,
    status: Option<StatusValue>,
    end_date: Option<DateValue>,
    due: Option<DateValue>,
    content: Option<ContentNode>,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum ContentNode {
    DraftIssue(ContentFields),
    Issue(ContentFields),
    PullRequest(ContentFields),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ContentFields {
    id: String,
    #[serde(default)]
    title: String,
    body: Option<String>,
    assignees: Option<Nodes<Login>>,
    labels: Option<Nodes<Named>>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
struct IssueRepository {
    repository: RepositoryLabels,
}

#[derive(Debug, Deserialize)]
struct RepositoryLabels {
    labels: Nodes<LabelNode>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    id: String,
    name: String,
}

fn board_item(node: ItemNode) -> Option<BoardItem> {
    if node.is_archived {
        return None;
    }
    let Some(content) = node.content else {
        tracing::warn!("item {} has no readable content; ignored", node.id);
        return None;
    };
    let (kind, fields) = match content {
        ContentNode::DraftIssue(f) => (ContentKind::Draft, f),
        ContentNode::Issue(f) => (ContentKind::Issue, f),
        ContentNode::PullRequest(f) => (ContentKind::PullRequest, f),
        ContentNode::Unknown => {
            tracing::warn!("item {} has an unsupported content type; ignored", node.id);
            return None;
        }
    };
    let labels: BTreeSet<String> = fields
        .labels
        .map(|l| l.into_present().map(|n| n.name).collect())
        .unwrap_or_default();
    Some(BoardItem {
        id: ItemId(node.id),
        content_id: Some(fields.id),
        kind,
        title: fields.title,
        description: fields.body.unwrap_or_default(),
        status: node.status.and_then(|s| s.name).unwrap_or_default(),
        due: node
            .end_date
            .and_then(|d| d.date)
            .or_else(|| node.due.and_then(|d| d.date)),
        assignee: fields
            .assignees
            .and_then(|a| a.into_present().next())
            .map(|u| u.login),
        scope_markers: labels.clone(),
        labels,
    })
}

fn graphql_error(errors: &[Value]) -> RemoteError {
    let kinds: Vec<&str> = errors
        .iter()
        .filter_map(|e| e.get("type").and_then(Value::as_str))
        .collect();
    let message = errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("; ");
    if kinds.contains(&"RATE_LIMITED") {
        RemoteError::RateLimited(message)
    } else if kinds.contains(&"FORBIDDEN") {
        RemoteError::Unauthorized(message)
    } else {
        RemoteError::Api(message)
    }
}

fn string_at(data: &Value, pointer: &str) -> Result<String, RemoteError> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RemoteError::Api(format!("response is missing {pointer}")))
}

fn find_option<'a>(options: &'a [StatusOption], status: &str) -> Option<&'a StatusOption> {
    let wanted = status.trim();
    options
        .iter()
        .find(|o| o.name == wanted)
        .or_else(|| options.iter().find(|o| o.name.eq_ignore_ascii_case(wanted)))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ProjectMeta {
    id: String,
    status_field: Option<String>,
    options: Vec<StatusOption>,
    due_field: Option<String>,
}

pub struct GithubClient<T: Transport = HttpTransport> {
    transport: T,
    owner: String,
    number: u64,
    repo: Option<RepoRef>,
    project: Option<ProjectMeta>,
    repo_id: Option<String>,
    items: HashMap<ItemId, BoardItem>,
}

impl GithubClient<HttpTransport> {
    pub fn new(token: impl Into<String>, owner: impl Into<String>, number: u64) -> Self {
        Self::with_transport(HttpTransport::new(token), owner, number)
    }
}

impl<T: Transport> GithubClient<T> {
    pub fn with_transport(transport: T, owner: impl Into<String>, number: u64) -> Self {
        Self {
            transport,
            owner: owner.into(),
            number,
            repo: None,
            project: None,
            repo_id: None,
            items: HashMap::new(),
        }
    }

    /// Repository new issues are created in and drafts are converted into.
    pub fn with_repo(mut self, repo: RepoRef) -> Self {
        self.repo = Some(repo);
        self
    }

    fn request(&mut self, query: &str, variables: Value) -> Result<Value, RemoteError> {
        let payload = json!({ "query": query, "variables": variables });
        let mut body = self.transport.post(&payload)?;
        if let Some(errors) = body
            .get("errors")
            .and_then(Value::as_array)
            .filter(|e| !e.is_empty())
        {
            return Err(graphql_error(errors));
        }
        match body.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(RemoteError::Api("response carried no data".into())),
        }
    }

    fn query<D: DeserializeOwned>(&mut self, query: &str, variables: Value) -> Result<D, RemoteError> {
        let data = self.request(query, variables)?;
        serde_json::from_value(data)
            .map_err(|e| RemoteError::Api(format!("unexpected response shape: {e}")))
    }

    fn meta(&mut self) -> Result<ProjectMeta, RemoteError> {
        if let Some(meta) = &self.project {
            return Ok(meta.clone());
        }
        let data: OwnerData = self.query(
            queries::PROJECT,
            json!({ "owner": self.owner, "number": self.number }),
        )?;
        let project = data
            .owner
            .and_then(|o| o.project)
            .ok_or_else(|| {
                RemoteError::Api(format!("project {}#{} not found", self.owner, self.number))
            })?;
        let (status_field, options) = match project.field {
            Some(StatusField { id: Some(id), options }) => (Some(id), options),
            _ => {
                tracing::warn!("project has no single-select Status field");
                (None, Vec::new())
            }
        };
        let due_field = project
            .end_date
            .and_then(DateField::date_id)
            .or_else(|| project.due.and_then(DateField::date_id));
        let meta = ProjectMeta {
            id: project.id,
            status_field,
            options,
            due_field,
        };
        tracing::debug!("resolved project {} ({} status options)", meta.id, meta.options.len());
        self.project = Some(meta.clone());
        Ok(meta)
    }

    fn repository_id(&mut self) -> Result<String, RemoteError> {
        if let Some(id) = &self.repo_id {
            return Ok(id.clone());
        }
        let repo = self
            .repo
            .clone()
            .ok_or_else(|| RemoteError::Unsupported("no target repository configured".into()))?;
        let data: RepositoryData = self.query(
            queries::REPOSITORY,
            json!({ "owner": repo.owner, "name": repo.name }),
        )?;
        let id = data
            .repository
            .map(|r| r.id)
            .ok_or_else(|| RemoteError::Api(format!("repository {repo} not found")))?;
        self.repo_id = Some(id.clone());
        Ok(id)
    }

    fn user_id(&mut self, login: &str) -> Result<String, RemoteError> {
        let data: UserData = self.query(queries::USER, json!({ "login": login }))?;
        data.user
            .map(|u| u.id)
            .ok_or_else(|| RemoteError::Api(format!("user '{login}' not found")))
    }

    fn label_ids(&mut self, issue_id: &str, names: &BTreeSet<String>) -> Result<Vec<String>, RemoteError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let data: NodeData<IssueRepository> =
            self.query(queries::ISSUE_LABELS, json!({ "issueId": issue_id }))?;
        let known: Vec<LabelNode> = data
            .node
            .map(|n| n.repository.labels.into_present().collect())
            .unwrap_or_default();

        let mut ids: Vec<String> = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            let wanted = name.to_lowercase();
            match known.iter().find(|l| l.name.to_lowercase() == wanted) {
                Some(label) if ids.contains(&label.id) => {}
                Some(label) => ids.push(label.id.clone()),
                None => missing.push(name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(RemoteError::Api(format!(
                "labels not found in repository: {}",
                missing.join(", ")
            )));
        }
        Ok(ids)
    }

    /// Set the Status field; returns the option name as the board spells it.
    fn set_status(&mut self, item: &ItemId, status: &str) -> Result<String, RemoteError> {
        let meta = self.meta()?;
        let field_id = meta
            .status_field
            .clone()
            .ok_or_else(|| RemoteError::Unsupported("project has no Status field".into()))?;
        let option = find_option(&meta.options, status)
            .ok_or_else(|| RemoteError::Api(format!("'{status}' is not a status option")))?;
        self.request(
            queries::SET_STATUS,
            json!({
                "projectId": meta.id,
                "itemId": item.as_str(),
                "fieldId": field_id,
                "optionId": option.id,
            }),
        )?;
        Ok(option.name.clone())
    }

    /// Set or clear the due date field.
    fn set_due(&mut self, item: &ItemId, due: Option<NaiveDate>) -> Result<(), RemoteError> {
        let meta = self.meta()?;
        let field_id = meta.due_field.clone().ok_or_else(|| {
            RemoteError::Unsupported("project has no 'End date' or 'Due' date field".into())
        })?;
        let mut variables = json!({
            "projectId": meta.id,
            "itemId": item.as_str(),
            "fieldId": field_id,
        });
        let query = match due {
            Some(date) => {
                variables["date"] = json!(date.format("%Y-%m-%d").to_string());
                queries::SET_DATE
            }
            None => queries::CLEAR_FIELD,
        };
        self.request(query, variables)?;
        Ok(())
    }

    fn cached(&self, id: &ItemId) -> Result<BoardItem, RemoteError> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.clone()))
    }
}

impl<T: Transport> BoardReader for GithubClient<T> {
    fn fetch_board(&mut self) -> Result<Board, RemoteError> {
        let meta = self.meta()?;
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let data: NodeData<ProjectItems> = self.query(
                queries::ITEMS,
                json!({ "projectId": meta.id, "cursor": cursor }),
            )?;
            let page = data
                .node
                .ok_or_else(|| RemoteError::Api(format!("project {} not found", meta.id)))?
                .items;
            items.extend(page.nodes.into_iter().flatten().filter_map(board_item));
            match page.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => cursor = Some(next),
                _ => break,
            }
        }
        tracing::info!("fetched {} items from project {}#{}", items.len(), self.owner, self.number);

        self.items = items
            .iter()
            .map(|item| (item.id.clone(), item.clone()))
            .collect();
        Ok(Board {
            statuses: meta.options.iter().map(|o| o.name.clone()).collect(),
            items,
        })
    }
}

impl<T: Transport> BoardWriter for GithubClient<T> {
    fn create_item(&mut self, new: &NewItem) -> Result<BoardItem, RemoteError> {
        match new.kind {
            ContentKind::PullRequest => {
                return Err(RemoteError::Unsupported(
                    "pull requests cannot be created from a task".into(),
                ))
            }
            ContentKind::Issue if self.repo.is_none() => {
                return Err(RemoteError::Unsupported(
                    "creating issues needs a target repository".into(),
                ))
            }
            _ => {}
        }

        let meta = self.meta()?;
        let (item_id, content_id) = if new.kind == ContentKind::Issue {
            let repository_id = self.repository_id()?;
            let created = self.request(
                queries::CREATE_ISSUE,
                json!({ "repositoryId": repository_id, "title": new.title, "body": new.description }),
            )?;
            let issue_id = string_at(&created, "/createIssue/issue/id")?;
            let added = self.request(
                queries::ADD_ITEM,
                json!({ "projectId": meta.id, "contentId": issue_id }),
            )?;
            (string_at(&added, "/addProjectV2ItemById/item/id")?, Some(issue_id))
        } else {
            let added = self.request(
                queries::ADD_DRAFT,
                json!({ "projectId": meta.id, "title": new.title, "body": new.description }),
            )?;
            (
                string_at(&added, "/addProjectV2DraftIssue/projectItem/id")?,
                string_at(&added, "/addProjectV2DraftIssue/projectItem/content/id").ok(),
            )
        };

        let mut item = BoardItem::new(item_id, new.title.clone(), String::new())
            .with_kind(new.kind)
            .with_description(new.description.clone());
        item.content_id = content_id;

        // The item exists now; a failed status write is left for the
        // follow-up update to retry.
        if !new.status.is_empty() {
            match self.set_status(&item.id, &new.status) {
                Ok(status) => item.status = status,
                Err(e) => tracing::warn!("status of new item {} not set: {e}", item.id),
            }
        }

        self.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn convert_item(&mut self, id: &ItemId, target: ContentKind) -> Result<BoardItem, RemoteError> {
        let current = self.cached(id)?;
        if !current.kind.converts_to(target) {
            return Err(RemoteError::Unsupported(format!(
                "cannot convert {} to {target}",
                current.kind
            )));
        }
        let repository_id = self.repository_id()?;
        let data = self.request(
            queries::CONVERT_DRAFT,
            json!({ "itemId": id.as_str(), "repositoryId": repository_id }),
        )?;
        let new_id = string_at(&data, "/convertProjectV2DraftIssueItemToIssue/item/id")?;
        let content_id =
            string_at(&data, "/convertProjectV2DraftIssueItemToIssue/item/content/id").ok();

        let converted = BoardItem {
            id: ItemId(new_id),
            content_id,
            kind: target,
            ..current
        };
        self.items.remove(id);
        self.items.insert(converted.id.clone(), converted.clone());
        Ok(converted)
    }

    fn update_item(&mut self, id: &ItemId, changes: &[FieldChange]) -> Result<(), RemoteError> {
        let item = self.cached(id)?;
        if let Some(change) = changes.iter().find(|c| !item.kind.can_write(c.field())) {
            return Err(RemoteError::Unsupported(format!(
                "{} items cannot have {} written",
                item.kind,
                change.field()
            )));
        }

        let mut content = Map::new();
        let mut status = None;
        let mut due = None;
        for change in changes {
            match change {
                FieldChange::Status(s) => status = Some(s.as_str()),
                FieldChange::Due(d) => due = Some(*d),
                FieldChange::Title(t) => {
                    content.insert("title".into(), json!(t));
                }
                FieldChange::Description(d) => {
                    content.insert("body".into(), json!(d));
                }
                FieldChange::Assignee(login) => {
                    let ids = match login {
                        Some(login) => vec![self.user_id(login)?],
                        None => Vec::new(),
                    };
                    content.insert("assigneeIds".into(), json!(ids));
                }
                FieldChange::Labels(names) => {
                    let issue_id = item.content_id.clone().unwrap_or_default();
                    content.insert("labelIds".into(), json!(self.label_ids(&issue_id, names)?));
                }
            }
        }

        if !content.is_empty() {
            let content_id = item
                .content_id
                .clone()
                .ok_or_else(|| RemoteError::Api(format!("item {id} has no content id")))?;
            let query = if item.kind == ContentKind::Draft {
                content.insert("draftIssueId".into(), json!(content_id));
                queries::UPDATE_DRAFT
            } else {
                content.insert("id".into(), json!(content_id));
                queries::UPDATE_ISSUE
            };
            self.request(query, Value::Object(content))?;
        }
        if let Some(status) = status {
            self.set_status(id, status)?;
        }
        if let Some(due) = due {
            self.set_due(id, due)?;
        }

        if let Some(cached) = self.items.get_mut(id) {
            for change in changes {
                change.apply_to(cached);
            }
            if cached.kind != ContentKind::Draft {
                cached.scope_markers = cached.labels.clone();
            }
        }
        Ok(())
    }

    fn archive_item(&mut self, id: &ItemId) -> Result<(), RemoteError> {
        let meta = self.meta()?;
        self.request(
            queries::ARCHIVE_ITEM,
            json!({ "projectId": meta.id, "itemId": id.as_str() }),
        )?;
        self.items.remove(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
