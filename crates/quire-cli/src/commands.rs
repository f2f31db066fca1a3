//! Subcommands and their dispatch.

use anyhow::{Context as _, bail};
use clap::Subcommand;
use quire_core::{
  PermissionLevel,
  collection::{CollectionPatch, NewCollection},
  document::{DocumentPatch, NewDocument},
  store::CollectionStore,
  tag::NewTag,
  user::User,
};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum Command {
  /// Register and look up users.
  #[command(subcommand)]
  User(UserCommand),
  /// Create, inspect and delete collections.
  #[command(subcommand)]
  Collection(CollectionCommand),
  /// Grant, change and revoke access to a collection.
  #[command(subcommand)]
  Permission(PermissionCommand),
  #[command(subcommand)]
  Document(DocumentCommand),
  #[command(subcommand)]
  Tag(TagCommand),
}

#[derive(Subcommand)]
pub enum UserCommand {
  Add {
    username: String,
    #[arg(long)]
    display:  Option<String>,
  },
  Show {
    username: String,
  },
}

#[derive(Subcommand)]
pub enum CollectionCommand {
  /// Create a collection owned by the acting user.
  Create {
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Collections the acting user can see.
  List,
  Show {
    id: Uuid,
  },
  Update {
    id:          Uuid,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    summary:     Option<String>,
  },
  Delete {
    id: Uuid,
  },
  Audits {
    id: Uuid,
  },
}

#[derive(Subcommand)]
pub enum PermissionCommand {
  /// Grant a level, overwriting any level the user already holds.
  Grant {
    collection: Uuid,
    username:   String,
    level:      PermissionLevel,
  },
  /// Change the level of a user who already holds one.
  Update {
    collection: Uuid,
    username:   String,
    level:      PermissionLevel,
  },
  /// Remove a user's access. Any user may remove their own.
  Revoke {
    collection: Uuid,
    username:   String,
  },
  /// Whether a user holds at least `level`.
  Check {
    collection: Uuid,
    username:   String,
    level:      PermissionLevel,
  },
  List {
    collection: Uuid,
  },
  Audits {
    collection: Uuid,
  },
}

#[derive(Subcommand)]
pub enum DocumentCommand {
  Create {
    #[arg(long)]
    collection:  Option<Uuid>,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  Show {
    id: Uuid,
  },
  Update {
    id:          Uuid,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    summary:     Option<String>,
  },
  /// Move into another collection, or out of every collection without `--to`.
  Move {
    id: Uuid,
    #[arg(long)]
    to: Option<Uuid>,
  },
  Delete {
    id: Uuid,
  },
  Audits {
    id: Uuid,
  },
  /// Replace the document's tags with the given ids and titles.
  Tag {
    id:    Uuid,
    items: Vec<String>,
  },
  Tags {
    id: Uuid,
  },
}

#[derive(Subcommand)]
pub enum TagCommand {
  Create {
    collection: Uuid,
    title:      String,
    #[arg(long, default_value = "#808080")]
    color:      String,
  },
  /// Map ids and titles to tag ids, creating missing titles.
  Resolve {
    collection: Uuid,
    #[arg(required = true)]
    items:      Vec<String>,
  },
  List {
    collection: Uuid,
  },
}

// ─── Access checks ───────────────────────────────────────────────────────────

async fn acting_user<S>(store: &S, actor: Option<&str>) -> anyhow::Result<User>
where
  S: CollectionStore,
{
  let Some(username) = actor else {
    bail!("this command needs --as <USERNAME>");
  };
  lookup(store, username).await
}

async fn lookup<S>(store: &S, username: &str) -> anyhow::Result<User>
where
  S: CollectionStore,
{
  store
    .get_user_by_name(username.to_owned())
    .await?
    .with_context(|| format!("no such user: {username}"))
}

async fn require<S>(
  store: &S,
  collection_id: Uuid,
  actor: &User,
  required: PermissionLevel,
) -> anyhow::Result<()>
where
  S: CollectionStore,
{
  if store
    .has_permission(collection_id, actor.user_id, required)
    .await?
  {
    return Ok(());
  }
  tracing::warn!(
    target: "audit",
    event = "access_denied",
    collection_id = %collection_id,
    actor = %actor.user_id,
    required = %required,
    "access denied"
  );
  bail!("{} lacks {required} on collection {collection_id}", actor.username)
}

/// Check access to a document through its collection. Documents outside any
/// collection are open to every registered user.
async fn require_document<S>(
  store: &S,
  document_id: Uuid,
  actor: &User,
  required: PermissionLevel,
) -> anyhow::Result<()>
where
  S: CollectionStore,
{
  let document = store
    .get_document(document_id)
    .await?
    .with_context(|| format!("no such document: {document_id}"))?;
  match document.collection_id {
    Some(collection_id) => require(store, collection_id, actor, required).await,
    None => Ok(()),
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

pub async fn run<S>(store: &S, actor: Option<String>, command: Command) -> anyhow::Result<Value>
where
  S: CollectionStore,
{
  let actor = actor.as_deref();
  let user = move || acting_user(store, actor);
  match command {
    Command::User(cmd) => run_user(store, cmd).await,
    Command::Collection(cmd) => run_collection(store, &user().await?, cmd).await,
    Command::Permission(cmd) => run_permission(store, &user().await?, cmd).await,
    Command::Document(cmd) => run_document(store, &user().await?, cmd).await,
    Command::Tag(cmd) => run_tag(store, &user().await?, cmd).await,
  }
}

async fn run_user<S>(store: &S, cmd: UserCommand) -> anyhow::Result<Value>
where
  S: CollectionStore,
{
  match cmd {
    UserCommand::Add { username, display } => {
      Ok(serde_json::to_value(store.register_user(username, display).await?)?)
    }
    UserCommand::Show { username } => Ok(serde_json::to_value(lookup(store, &username).await?)?),
  }
}

async fn run_collection<S>(store: &S, actor: &User, cmd: CollectionCommand) -> anyhow::Result<Value>
where
  S: CollectionStore,
{
  let value = match cmd {
    CollectionCommand::Create { title, description } => {
      let input = NewCollection { title, description };
      serde_json::to_value(store.create_collection(input, actor.user_id).await?)?
    }
    CollectionCommand::List => {
      serde_json::to_value(store.list_user_collections(actor.user_id).await?)?
    }
    CollectionCommand::Show { id } => {
      require(store, id, actor, PermissionLevel::Read).await?;
      serde_json::to_value(store.get_collection(id).await?)?
    }
    CollectionCommand::Update { id, title, description, summary } => {
      require(store, id, actor, PermissionLevel::Edit).await?;
      let patch = CollectionPatch { title, description, summary };
      serde_json::to_value(store.update_collection(id, patch, actor.user_id).await?)?
    }
    CollectionCommand::Delete { id } => {
      require(store, id, actor, PermissionLevel::Owner).await?;
      json!({ "deleted": store.delete_collection(id, actor.user_id).await? })
    }
    CollectionCommand::Audits { id } => {
      require(store, id, actor, PermissionLevel::Owner).await?;
      serde_json::to_value(store.collection_audits(id).await?)?
    }
  };
  Ok(value)
}

async fn run_permission<S>(store: &S, actor: &User, cmd: PermissionCommand) -> anyhow::Result<Value>
where
  S: CollectionStore,
{
  let value = match cmd {
    PermissionCommand::Grant { collection, username, level } => {
      require(store, collection, actor, PermissionLevel::Owner).await?;
      let target = lookup(store, &username).await?;
      serde_json::to_value(
        store
          .grant(collection, target.user_id, level, actor.user_id)
          .await?,
      )?
    }
    PermissionCommand::Update { collection, username, level } => {
      require(store, collection, actor, PermissionLevel::Owner).await?;
      let target = lookup(store, &username).await?;
      serde_json::to_value(
        store
          .update_permission(collection, target.user_id, level, actor.user_id)
          .await?,
      )?
    }
    PermissionCommand::Revoke { collection, username } => {
      let target = lookup(store, &username).await?;
      if target.user_id != actor.user_id {
        require(store, collection, actor, PermissionLevel::Owner).await?;
      }
      json!({ "revoked": store.revoke(collection, target.user_id, actor.user_id).await? })
    }
    PermissionCommand::Check { collection, username, level } => {
      require(store, collection, actor, PermissionLevel::Read).await?;
      let target = lookup(store, &username).await?;
      json!({ "allowed": store.has_permission(collection, target.user_id, level).await? })
    }
    PermissionCommand::List { collection } => {
      require(store, collection, actor, PermissionLevel::Read).await?;
      serde_json::to_value(store.list_permissions(collection).await?)?
    }
    PermissionCommand::Audits { collection } => {
      require(store, collection, actor, PermissionLevel::Owner).await?;
      serde_json::to_value(store.permission_audits(collection).await?)?
    }
  };
  Ok(value)
}

async fn run_document<S>(store: &S, actor: &User, cmd: DocumentCommand) -> anyhow::Result<Value>
where
  S: CollectionStore,
{
  let who = Some(actor.user_id);
  let value = match cmd {
    DocumentCommand::Create { collection, title, description } => {
      if let Some(collection_id) = collection {
        require(store, collection_id, actor, PermissionLevel::Edit).await?;
      }
      let input = NewDocument { collection_id: collection, title, description };
      serde_json::to_value(store.create_document(input, who).await?)?
    }
    DocumentCommand::Show { id } => {
      require_document(store, id, actor, PermissionLevel::Read).await?;
      serde_json::to_value(store.get_document(id).await?)?
    }
    DocumentCommand::Update { id, title, description, summary } => {
      require_document(store, id, actor, PermissionLevel::Edit).await?;
      let patch = DocumentPatch { title, description, summary };
      serde_json::to_value(store.update_document(id, patch, who).await?)?
    }
    DocumentCommand::Move { id, to } => {
      require_document(store, id, actor, PermissionLevel::Edit).await?;
      if let Some(collection_id) = to {
        require(store, collection_id, actor, PermissionLevel::Edit).await?;
      }
      serde_json::to_value(store.move_document(id, to, who).await?)?
    }
    DocumentCommand::Delete { id } => {
      require_document(store, id, actor, PermissionLevel::Edit).await?;
      json!({ "deleted": store.delete_document(id, who).await? })
    }
    DocumentCommand::Audits { id } => {
      require_document(store, id, actor, PermissionLevel::Read).await?;
      serde_json::to_value(store.document_audits(id).await?)?
    }
    DocumentCommand::Tag { id, items } => {
      require_document(store, id, actor, PermissionLevel::Edit).await?;
      serde_json::to_value(store.set_document_tags(id, items).await?)?
    }
    DocumentCommand::Tags { id } => {
      require_document(store, id, actor, PermissionLevel::Read).await?;
      serde_json::to_value(store.document_tags(id).await?)?
    }
  };
  Ok(value)
}

async fn run_tag<S>(store: &S, actor: &User, cmd: TagCommand) -> anyhow::Result<Value>
where
  S: CollectionStore,
{
  let value = match cmd {
    TagCommand::Create { collection, title, color } => {
      require(store, collection, actor, PermissionLevel::Edit).await?;
      let input = NewTag { collection_id: collection, title, color };
      serde_json::to_value(store.create_tag(input).await?)?
    }
    TagCommand::Resolve { collection, items } => {
      require(store, collection, actor, PermissionLevel::Edit).await?;
      serde_json::to_value(store.resolve_tags(collection, items).await?)?
    }
    TagCommand::List { collection } => {
      require(store, collection, actor, PermissionLevel::Read).await?;
      serde_json::to_value(store.list_tags(collection).await?)?
    }
  };
  Ok(value)
}
