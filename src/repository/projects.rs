use serde_json::json;

use super::{ContentRepository, guard::require_owner};
use crate::error::{Error, Result};
use crate::github::parse_repo_url;
use crate::store::{path, server_timestamp};
use crate::types::{Project, Session};

impl ContentRepository {
    /// Projects under `username`, newest first.
    pub fn list_projects(&self, username: &str) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.read_collection(&path::projects(username)?)?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(projects)
    }

    pub fn get_project(&self, username: &str, project_id: &str) -> Result<Project> {
        self.read_record(&path::project(username, project_id)?, project_id)?
            .ok_or_else(|| Error::not_found(format!("Project '{project_id}'")))
    }

    /// Snapshots the repository's live GitHub metadata into a new project
    /// under `username`. The URL is checked before anything goes out on the
    /// network.
    pub async fn add_project(
        &self,
        session: &Session,
        repo_url: &str,
        description: &str,
        username: &str,
    ) -> Result<Project> {
        let (owner, repo) = parse_repo_url(repo_url)?;

        if self.own_username(session)? != username {
            return Err(Error::forbidden(format!(
                "Cannot add projects to '{username}'"
            )));
        }

        let repo_info = self.github.fetch_repo(&owner, &repo).await?;

        let record = json!({
            "username": username,
            "ownerId": session.uid,
            "repoUrl": repo_url.trim(),
            "customDescription": description,
            "repoInfo": repo_info,
            "createdAt": server_timestamp(),
        });
        let project_id = self.store.push(&path::projects(username)?, &record)?;

        tracing::info!("{username} added project {owner}/{repo} as {project_id}");
        self.get_project(username, &project_id)
    }

    /// Deleting a project that is already gone succeeds. An existing one may
    /// only be removed by the uid recorded as its owner.
    pub fn delete_project(
        &self,
        session: &Session,
        project_id: &str,
        username: &str,
    ) -> Result<()> {
        let project_path = path::project(username, project_id)?;
        let Some(project) = self.read_record::<Project>(&project_path, project_id)? else {
            tracing::info!("{username}/projects/{project_id} already absent");
            return Ok(());
        };
        require_owner(session, &project.owner_id, "project")?;

        self.store.remove(&project_path)?;
        tracing::info!("{username} deleted project {project_id}");
        Ok(())
    }
}
