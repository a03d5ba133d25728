use serde_json::{Map, Value, json};

use super::{ContentRepository, PostQuery, TagCount, guard::require_owner, tag_summary};
use crate::error::{Error, Result};
use crate::store::{path, server_timestamp};
use crate::types::{Comment, Post, Session};
use crate::validation::{normalize_tags, validate_title};

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Fields to change on an existing post. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ContentRepository {
    /// Every post under `username`, in creation order. A missing user and a
    /// user without posts both give an empty list.
    pub fn list_posts(&self, username: &str) -> Result<Vec<Post>> {
        self.read_collection(&path::posts(username)?)
    }

    /// Posts matching `query`, newest first.
    pub fn search_posts(&self, username: &str, query: &PostQuery) -> Result<Vec<Post>> {
        Ok(query.apply(self.list_posts(username)?))
    }

    pub fn post_tags(&self, username: &str) -> Result<Vec<TagCount>> {
        Ok(tag_summary(&self.list_posts(username)?))
    }

    pub fn get_post(&self, username: &str, post_id: &str) -> Result<Post> {
        self.read_record(&path::post(username, post_id)?, post_id)?
            .ok_or_else(|| Error::not_found(format!("Post '{post_id}'")))
    }

    /// Creates a post in the session's own namespace and returns its id.
    pub fn add_post(&self, session: &Session, post: NewPost) -> Result<String> {
        validate_title(&post.title)?;
        let tags = normalize_tags(&post.tags)?;
        let username = self.own_username(session)?;

        let record = json!({
            "title": post.title.trim(),
            "content": post.content,
            "tags": tags,
            "authorId": session.uid,
            "createdAt": server_timestamp(),
            "updatedAt": server_timestamp(),
        });
        let post_id = self.store.push(&path::posts(&username)?, &record)?;

        tracing::info!("{username} created post {post_id}");
        Ok(post_id)
    }

    pub fn update_post(
        &self,
        session: &Session,
        username: &str,
        post_id: &str,
        update: PostUpdate,
    ) -> Result<Post> {
        let existing = self.get_post(username, post_id)?;
        require_owner(session, &existing.author_id, "post")?;

        let mut fields = Map::new();
        if let Some(title) = update.title {
            validate_title(&title)?;
            fields.insert("title".into(), Value::from(title.trim()));
        }
        if let Some(content) = update.content {
            fields.insert("content".into(), Value::from(content));
        }
        if let Some(tags) = update.tags {
            fields.insert("tags".into(), json!(normalize_tags(&tags)?));
        }
        fields.insert("updatedAt".into(), server_timestamp());

        if !self
            .store
            .update_if_exists(&path::post(username, post_id)?, &fields)?
        {
            return Err(Error::not_found(format!("Post '{post_id}'")));
        }

        tracing::info!("{username}/{post_id} updated");
        self.get_post(username, post_id)
    }

    /// Removes the post and its comments.
    pub fn delete_post(&self, session: &Session, username: &str, post_id: &str) -> Result<()> {
        let existing = self.get_post(username, post_id)?;
        require_owner(session, &existing.author_id, "post")?;

        self.store.remove(&path::post(username, post_id)?)?;
        tracing::info!("{username}/{post_id} deleted");
        Ok(())
    }

    /// Comments on a post, oldest first.
    pub fn list_comments(&self, username: &str, post_id: &str) -> Result<Vec<Comment>> {
        self.ensure_post(username, post_id)?;
        self.read_collection(&path::comments(username, post_id)?)
    }

    /// Any signed-in caller may comment on an existing post.
    pub fn add_comment(
        &self,
        session: &Session,
        username: &str,
        post_id: &str,
        content: &str,
    ) -> Result<String> {
        if content.trim().is_empty() {
            return Err(Error::invalid("Comment cannot be empty"));
        }

        let record = json!({
            "content": content,
            "authorId": session.uid,
            "createdAt": server_timestamp(),
        });
        // A post without its author field has been deleted.
        let guard = path::child(&path::post(username, post_id)?, "authorId")?;
        self.store
            .push_if_exists(&guard, &path::comments(username, post_id)?, &record)?
            .ok_or_else(|| Error::not_found(format!("Post '{post_id}'")))
    }

    pub fn delete_comment(
        &self,
        session: &Session,
        username: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Result<()> {
        let comment_path = path::comment(username, post_id, comment_id)?;
        let comment: Comment = self
            .read_record(&comment_path, comment_id)?
            .ok_or_else(|| Error::not_found(format!("Comment '{comment_id}'")))?;
        require_owner(session, &comment.author_id, "comment")?;

        self.store.remove(&comment_path)?;
        Ok(())
    }

    fn ensure_post(&self, username: &str, post_id: &str) -> Result<()> {
        if self.store.exists(&path::post(username, post_id)?)? {
            Ok(())
        } else {
            Err(Error::not_found(format!("Post '{post_id}'")))
        }
    }
}
