//! GraphQL documents sent to the GitHub API.

pub const PROJECT: &str = r#"
query($owner: String!, $number: Int!) {
  repositoryOwner(login: $owner) {
    ... on ProjectV2Owner {
      projectV2(number: $number) {
        id
        field(name: "Status") {
          ... on ProjectV2SingleSelectField {
            id
            options { id name }
          }
        }
        endDate: field(name: "End date") {
          ... on ProjectV2Field { id dataType }
        }
        due: field(name: "Due") {
          ... on ProjectV2Field { id dataType }
        }
      }
    }
  }
}
"#;

pub const ITEMS: &str = r#"
query($projectId: ID!, $cursor: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          isArchived
          status: fieldValueByName(name: "Status") {
            ... on ProjectV2ItemFieldSingleSelectValue { name }
          }
          endDate: fieldValueByName(name: "End date") {
            ... on ProjectV2ItemFieldDateValue { date }
          }
          due: fieldValueByName(name: "Due") {
            ... on ProjectV2ItemFieldDateValue { date }
          }
          content {
            __typename
            ... on DraftIssue {
              id
              title
              body
              assignees(first: 1) { nodes { login } }
            }
            ... on Issue {
              id
              title
              body
              assignees(first: 1) { nodes { login } }
              labels(first: 50) { nodes { name } }
            }
            ... on PullRequest {
              id
              title
              body
              assignees(first: 1) { nodes { login } }
              labels(first: 50) { nodes { name } }
            }
          }
        }
      }
    }
  }
}
"#;

pub const REPOSITORY: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) { id }
}
"#;

pub const ISSUE_LABELS: &str = r#"
query($issueId: ID!) {
  node(id: $issueId) {
    ... on Issue {
      repository {
        labels(first: 100) { nodes { id name } }
      }
    }
  }
}
"#;

pub const USER: &str = r#"
query($login: String!) {
  user(login: $login) { id }
}
"#;

pub const ADD_DRAFT: &str = r#"
mutation($projectId: ID!, $title: String!, $body: String) {
  addProjectV2DraftIssue(input: { projectId: $projectId, title: $title, body: $body }) {
    projectItem {
      id
      content { ... on DraftIssue { id } }
    }
  }
}
"#;

pub const CREATE_ISSUE: &str = r#"
mutation($repositoryId: ID!, $title: String!, $body: String) {
  createIssue(input: { repositoryId: $repositoryId, title: $title, body: $body }) {
    issue { id }
  }
}
"#;

pub const ADD_ITEM: &str = r#"
mutation($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: { projectId: $projectId, contentId: $contentId }) {
    item { id }
  }
}
"#;

pub const CONVERT_DRAFT: &str = r#"
mutation($itemId: ID!, $repositoryId: ID!) {
  convertProjectV2DraftIssueItemToIssue(input: { itemId: $itemId, repositoryId: $repositoryId }) {
    item {
      id
      content { ... on Issue { id } }
    }
  }
}
"#;

pub const SET_STATUS: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId,
    itemId: $itemId,
    fieldId: $fieldId,
    value: { singleSelectOptionId: $optionId }
  }) {
    projectV2Item { id }
  }
}
"#;

pub const SET_DATE: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $date: Date!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId,
    itemId: $itemId,
    fieldId: $fieldId,
    value: { date: $date }
  }) {
    projectV2Item { id }
  }
}
"#;

pub const CLEAR_FIELD: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!) {
  clearProjectV2ItemFieldValue(input: { projectId: $projectId, itemId: $itemId, fieldId: $fieldId }) {
    projectV2Item { id }
  }
}
"#;

pub const UPDATE_DRAFT: &str = r#"
mutation($draftIssueId: ID!, $title: String, $body: String) {
  updateProjectV2DraftIssue(input: { draftIssueId: $draftIssueId, title: $title, body: $body }) {
    draftIssue { id }
  }
}
"#;

pub const UPDATE_ISSUE: &str = r#"
mutation($id: ID!, $title: String, $body: String, $assigneeIds: [ID!], $labelIds: [ID!]) {
  updateIssue(input: { id: $id, title: $title, body: $body, assigneeIds: $assigneeIds, labelIds: $labelIds }) {
    issue { id }
  }
}
"#;

pub const ARCHIVE_ITEM: &str = r#"
mutation($projectId: ID!, $itemId: ID!) {
  archiveProjectV2Item(input: { projectId: $projectId, itemId: $itemId }) {
    item { id }
  }
}
"#;
