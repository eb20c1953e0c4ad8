//! Remote reconciliation: adopt the server's book uuids.
//!
//! Books are created offline with locally generated uuids. Once the device is
//! logged in, the server's book list is the authority: every book whose label
//! the server knows takes the server's uuid, and every action that refers to
//! such a book is rewritten to match. Books the server has not seen yet keep
//! their local uuid, and so do the actions pointing at them.

use std::collections::HashMap;

use jotter_core::{
  action::{Action, ActionType, AddBookDataV2, AddNoteDataV3, EditNoteDataV3, RemoveBookDataV2},
  book::{Book, RemoteBook},
};
use jotter_store_sqlite::{actions, books};
use rusqlite::Transaction;
use tracing::{debug, warn};

use crate::{Error, Migration, Result};

/// The remote track, in the order the steps must run.
pub fn remote_sequence() -> Vec<Migration> {
  vec![Migration::remote("sync-book-uuids-from-server", sync_book_uuids)]
}

/// label → server uuid
type UuidMap<'a> = HashMap<&'a str, &'a str>;

fn sync_book_uuids(tx: &Transaction<'_>, server_books: &[RemoteBook]) -> Result<()> {
  let uuid_map: UuidMap<'_> = server_books
    .iter()
    .map(|b| (b.label.as_str(), b.uuid.as_str()))
    .collect();

  // Actions first: their references are resolved through the local uuids,
  // which are only replaced afterwards.
  for action in actions::all_actions(tx)? {
    let rewritten = rewrite_action(tx, &action, &uuid_map)
      .map_err(|e| e.in_action(action.kind, &action.uuid))?;

    if let Some(data) = rewritten {
      actions::rewrite_action_data(tx, &action.uuid, &data)?;
      debug!(uuid = %action.uuid, kind = %action.kind, "rewrote book reference");
    }
  }

  let mut adopted = Vec::new();
  for book in books::all_books(tx)? {
    match uuid_map.get(book.label.as_str()) {
      Some(&server_uuid) if server_uuid != book.uuid => adopted.push((book, server_uuid)),
      Some(_) => {}
      None => warn!(label = %book.label, "book unknown to server; keeping local uuid"),
    }
  }
  adopt_server_uuids(tx, &adopted)
}

/// Give each book its server uuid. The server may hand a book a uuid that
/// another local book still holds, so every changing row is first parked on
/// a placeholder derived from its unique label.
fn adopt_server_uuids(tx: &Transaction<'_>, adopted: &[(Book, &str)]) -> Result<()> {
  for (book, _) in adopted {
    books::set_book_uuid(tx, &book.label, &format!("reconciling:{}", book.label))?;
  }
  for (book, server_uuid) in adopted {
    books::set_book_uuid(tx, &book.label, server_uuid)?;
    debug!(label = %book.label, from = %book.uuid, to = *server_uuid, "adopted server book uuid");
  }
  Ok(())
}

/// New payload for `action`, or `None` when it needs no change.
fn rewrite_action(
  tx:       &Transaction<'_>,
  action:   &Action,
  uuid_map: &UuidMap<'_>,
) -> Result<Option<String>> {
  if action.kind != ActionType::RemoveNote && !action.is_latest() {
    return Err(Error::UnexpectedSchema { kind: action.kind, schema: action.schema });
  }

  let data = match action.kind {
    ActionType::AddNote => {
      let mut data: AddNoteDataV3 = action.decode()?;
      match server_uuid_for(tx, &data.book_uuid, uuid_map)? {
        Some(uuid) => {
          data.book_uuid = uuid.to_owned();
          Some(serde_json::to_string(&data)?)
        }
        None => None,
      }
    }
    ActionType::EditNote => {
      let mut data: EditNoteDataV3 = action.decode()?;
      let Some(local) = data.book_uuid.as_deref() else {
        return Ok(None);
      };
      match server_uuid_for(tx, local, uuid_map)? {
        Some(uuid) => {
          data.book_uuid = Some(uuid.to_owned());
          Some(serde_json::to_string(&data)?)
        }
        None => None,
      }
    }
    ActionType::AddBook => {
      let mut data: AddBookDataV2 = action.decode()?;
      match uuid_map.get(data.book_name.as_str()) {
        Some(&uuid) => {
          data.book_uuid = uuid.to_owned();
          Some(serde_json::to_string(&data)?)
        }
        None => None,
      }
    }
    ActionType::RemoveBook => {
      let mut data: RemoveBookDataV2 = action.decode()?;
      // The book is usually gone by now, so prefer the name stored in the
      // payload over a lookup.
      let label = match &data.book_name {
        Some(name) => Some(name.clone()),
        None => books::find_book_label(tx, &data.book_uuid)?,
      };
      match label.as_deref().and_then(|l| uuid_map.get(l)) {
        Some(&uuid) => {
          data.book_uuid = uuid.to_owned();
          Some(serde_json::to_string(&data)?)
        }
        None => None,
      }
    }
    ActionType::RemoveNote => None,
  };

  Ok(data)
}

/// Map a book reference embedded in a payload to the server's uuid for the
/// same book. Fails if the reference matches no local book.
fn server_uuid_for<'m>(
  tx:         &Transaction<'_>,
  local_uuid: &str,
  uuid_map:   &UuidMap<'m>,
) -> Result<Option<&'m str>> {
  let label = books::book_label_by_uuid(tx, local_uuid)?;
  Ok(uuid_map.get(label.as_str()).copied())
}

#[cfg(test)]
mod tests {
  use std::net::SocketAddr;

  use axum::{Json, Router, http::{HeaderMap, StatusCode}, routing::get};
  use jotter_store_sqlite::{SqliteStore, system};
  use serde_json::json;
  use tokio::net::TcpListener;

  use super::*;
  use crate::{ApiConfig, Context, ErrorKind, Track, run};

  const TS: i64 = 1537829463;
  const API_KEY: &str = "mock_api_key";

  /// Serve `books` from `GET /v1/books` on an ephemeral port.
  async fn serve(books: Vec<RemoteBook>) -> SocketAddr {
    let app = Router::new().route(
      "/v1/books",
      get(move |headers: HeaderMap| {
        let books = books.clone();
        async move {
          let authorized = headers
            .get("authorization")
            .is_some_and(|v| v == API_KEY);
          let versioned = headers.contains_key("cli-version");
          if authorized && versioned {
            Ok(Json(books))
          } else {
            Err(StatusCode::UNAUTHORIZED)
          }
        }
      }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
  }

  fn remote(uuid: &str, label: &str) -> RemoteBook {
    RemoteBook { uuid: uuid.into(), label: label.into() }
  }

  async fn context(endpoint: String, api_key: Option<&str>) -> Context {
    let store = SqliteStore::open_in_memory()
      .await
      .expect("in-memory store");
    store
      .transaction(|tx| system::init_counter(tx, system::REMOTE_SCHEMA_KEY, 0))
      .await
      .unwrap();

    Context {
      store,
      api: ApiConfig {
        endpoint,
        api_key: api_key.map(str::to_owned),
        client_version: "0.1.0".into(),
      },
    }
  }

  async fn insert(ctx: &Context, uuid: &str, schema: i64, kind: ActionType, data: serde_json::Value) {
    let uuid = uuid.to_owned();
    ctx
      .store
      .transaction(move |tx| {
        actions::insert_action_with_uuid(tx, &uuid, schema, kind, &data.to_string(), TS)
      })
      .await
      .unwrap();
  }

  async fn action(ctx: &Context, uuid: &str) -> Action {
    ctx.store.get_action(uuid).await.unwrap().expect("action exists")
  }

  async fn book_uuid(ctx: &Context, label: &str) -> Option<String> {
    ctx.store.book_uuid_by_label(label).await.unwrap()
  }

  async fn remote_counter(ctx: &Context) -> Option<i64> {
    ctx.store.read_counter(system::REMOTE_SCHEMA_KEY).await.unwrap()
  }

  #[tokio::test]
  async fn reconciles_books_and_action_references() {
    let addr = serve(vec![
      remote("new-js-book-uuid", "js"),
      remote("new-css-book-uuid", "css"),
    ])
    .await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;
    let s = &ctx.store;

    s.insert_book("js-local", "js").await.unwrap();
    s.insert_book("css-local", "css").await.unwrap();
    s.insert_book("linux-local", "linux").await.unwrap();

    insert(&ctx, "a1", 2, ActionType::AddBook, json!({"book_name": "js", "book_uuid": "js-local"})).await;
    insert(&ctx, "a2", 2, ActionType::AddBook, json!({"book_name": "css", "book_uuid": "css-local"})).await;
    insert(&ctx, "a3", 2, ActionType::AddBook, json!({"book_name": "linux", "book_uuid": "linux-local"})).await;
    insert(&ctx, "a4", 2, ActionType::AddBook, json!({"book_name": "bash", "book_uuid": "bash-local"})).await;
    insert(&ctx, "a5", 3, ActionType::AddNote, json!({
      "note_uuid": "note-1-uuid", "book_uuid": "js-local", "content": "note-1", "public": false
    }))
    .await;
    insert(&ctx, "a6", 3, ActionType::AddNote, json!({
      "note_uuid": "note-2-uuid", "book_uuid": "js-local", "content": "note-2", "public": false
    }))
    .await;
    insert(&ctx, "a7", 3, ActionType::AddNote, json!({
      "note_uuid": "note-3-uuid", "book_uuid": "css-local", "content": "note-3", "public": false
    }))
    .await;
    insert(&ctx, "a8", 3, ActionType::AddNote, json!({
      "note_uuid": "note-4-uuid", "book_uuid": "linux-local", "content": "note-4", "public": false
    }))
    .await;
    insert(&ctx, "a9", 3, ActionType::EditNote, json!({
      "note_uuid": "note-1-uuid", "content": "note-1-edited"
    }))
    .await;
    insert(&ctx, "a10", 3, ActionType::EditNote, json!({
      "note_uuid": "note-4-uuid", "book_uuid": "css-local"
    }))
    .await;
    // "bash" was removed locally and never reached the server.
    insert(&ctx, "a11", 2, ActionType::RemoveBook, json!({"book_uuid": "bash-local"})).await;
    insert(&ctx, "a12", 2, ActionType::RemoveBook, json!({"book_name": "css", "book_uuid": "css-local"})).await;
    insert(&ctx, "a13", 2, ActionType::RemoveNote, json!({"note_uuid": "note-2-uuid"})).await;

    run(&ctx, Track::Remote, &remote_sequence()).await.unwrap();
    assert_eq!(remote_counter(&ctx).await, Some(1));

    assert_eq!(book_uuid(&ctx, "js").await.as_deref(), Some("new-js-book-uuid"));
    assert_eq!(book_uuid(&ctx, "css").await.as_deref(), Some("new-css-book-uuid"));
    assert_eq!(book_uuid(&ctx, "linux").await.as_deref(), Some("linux-local"));

    for (uuid, expected) in [
      ("a1", "new-js-book-uuid"),
      ("a2", "new-css-book-uuid"),
      ("a3", "linux-local"),
      ("a4", "bash-local"),
    ] {
      let a = action(&ctx, uuid).await;
      assert_eq!(a.schema, 2);
      assert_eq!(a.timestamp, TS);
      let data: AddBookDataV2 = a.decode().unwrap();
      assert_eq!(data.book_uuid, expected, "{uuid}");
    }

    for (uuid, expected) in [
      ("a5", "new-js-book-uuid"),
      ("a6", "new-js-book-uuid"),
      ("a7", "new-css-book-uuid"),
      ("a8", "linux-local"),
    ] {
      let a = action(&ctx, uuid).await;
      assert_eq!(a.schema, 3);
      let data: AddNoteDataV3 = a.decode().unwrap();
      assert_eq!(data.book_uuid, expected, "{uuid}");
    }

    let a9: EditNoteDataV3 = action(&ctx, "a9").await.decode().unwrap();
    assert_eq!(a9.book_uuid, None);
    assert_eq!(a9.content.as_deref(), Some("note-1-edited"));

    let a10: EditNoteDataV3 = action(&ctx, "a10").await.decode().unwrap();
    assert_eq!(a10.book_uuid.as_deref(), Some("new-css-book-uuid"));
    assert_eq!(a10.content, None);

    let a11: RemoveBookDataV2 = action(&ctx, "a11").await.decode().unwrap();
    assert_eq!(a11.book_uuid, "bash-local");

    let a12: RemoveBookDataV2 = action(&ctx, "a12").await.decode().unwrap();
    assert_eq!(a12.book_uuid, "new-css-book-uuid");
    assert_eq!(a12.book_name.as_deref(), Some("css"));

    let a13 = action(&ctx, "a13").await;
    assert_eq!(a13.data, json!({"note_uuid": "note-2-uuid"}).to_string());
  }

  #[tokio::test]
  async fn resolves_labels_through_the_embedded_book_reference() {
    let addr = serve(vec![remote("server-js", "js"), remote("server-css", "css")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;

    ctx.store.insert_book("js-local", "js").await.unwrap();
    ctx.store.insert_book("css-local", "css").await.unwrap();

    // The action's own uuid collides with the css book's uuid; only the
    // payload's book_uuid may decide which book it refers to.
    insert(&ctx, "css-local", 3, ActionType::AddNote, json!({
      "note_uuid": "note-1-uuid", "book_uuid": "js-local", "content": "n", "public": false
    }))
    .await;
    insert(&ctx, "js-local", 3, ActionType::EditNote, json!({
      "note_uuid": "note-1-uuid", "book_uuid": "css-local"
    }))
    .await;

    run(&ctx, Track::Remote, &remote_sequence()).await.unwrap();

    let add: AddNoteDataV3 = action(&ctx, "css-local").await.decode().unwrap();
    assert_eq!(add.book_uuid, "server-js");
    let edit: EditNoteDataV3 = action(&ctx, "js-local").await.decode().unwrap();
    assert_eq!(edit.book_uuid.as_deref(), Some("server-css"));
  }

  #[tokio::test]
  async fn remove_book_without_name_falls_back_to_its_book_reference() {
    let addr = serve(vec![remote("server-js", "js")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;

    ctx.store.insert_book("js-local", "js").await.unwrap();
    insert(&ctx, "a1", 2, ActionType::RemoveBook, json!({"book_uuid": "js-local"})).await;

    run(&ctx, Track::Remote, &remote_sequence()).await.unwrap();

    let data: RemoveBookDataV2 = action(&ctx, "a1").await.decode().unwrap();
    assert_eq!(data.book_uuid, "server-js");
  }

  #[tokio::test]
  async fn unmigrated_row_is_an_invariant_violation() {
    let addr = serve(vec![remote("server-js", "js")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;

    ctx.store.insert_book("js-local", "js").await.unwrap();
    insert(&ctx, "a1", 3, ActionType::AddNote, json!({
      "note_uuid": "note-1-uuid", "book_uuid": "js-local", "content": "n", "public": false
    }))
    .await;
    insert(&ctx, "a2", 2, ActionType::AddNote, json!({
      "note_uuid": "note-2-uuid", "book_name": "js", "content": "n", "public": false
    }))
    .await;

    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    let message = err.to_string();
    assert!(message.contains("a2"), "{message}");
    assert!(message.contains("unsupported schema 2 for add_note"), "{message}");

    // Nothing from the step survives, a1 included.
    assert_eq!(remote_counter(&ctx).await, Some(0));
    assert_eq!(book_uuid(&ctx, "js").await.as_deref(), Some("js-local"));
    let a1: AddNoteDataV3 = action(&ctx, "a1").await.decode().unwrap();
    assert_eq!(a1.book_uuid, "js-local");
  }

  #[tokio::test]
  async fn dangling_note_reference_fails_the_step() {
    let addr = serve(vec![remote("server-js", "js")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;

    insert(&ctx, "a1", 3, ActionType::AddNote, json!({
      "note_uuid": "note-1-uuid", "book_uuid": "gone", "content": "n", "public": false
    }))
    .await;

    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert_eq!(remote_counter(&ctx).await, Some(0));
  }

  #[tokio::test]
  async fn missing_api_key_requires_login_before_any_request() {
    let ctx = context("http://127.0.0.1:9".into(), Some("")).await;
    ctx.store.insert_book("js-local", "js").await.unwrap();

    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert!(err.is_login_required());
    assert_eq!(remote_counter(&ctx).await, Some(0));
  }

  #[tokio::test]
  async fn rejected_request_is_a_transport_failure() {
    let addr = serve(vec![remote("server-js", "js")]).await;
    let ctx = context(format!("http://{addr}"), Some("wrong-key")).await;
    ctx.store.insert_book("js-local", "js").await.unwrap();

    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("401"), "{err}");
    assert_eq!(remote_counter(&ctx).await, Some(0));
    assert_eq!(book_uuid(&ctx, "js").await.as_deref(), Some("js-local"));
  }

  #[tokio::test]
  async fn unreachable_server_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;
    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(remote_counter(&ctx).await, Some(0));
  }

  #[tokio::test]
  async fn malformed_book_list_is_a_transport_failure() {
    let app = Router::new().route("/v1/books", get(|| async { "not json" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;
    ctx.store.insert_book("js-local", "js").await.unwrap();

    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(remote_counter(&ctx).await, Some(0));
    assert_eq!(book_uuid(&ctx, "js").await.as_deref(), Some("js-local"));
  }

  #[tokio::test]
  async fn unmigrated_book_removal_is_an_invariant_violation() {
    let addr = serve(vec![remote("server-js", "js")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;

    ctx.store.insert_book("js-local", "js").await.unwrap();
    insert(&ctx, "a1", 1, ActionType::RemoveBook, json!({"book_name": "js"})).await;

    let err = run(&ctx, Track::Remote, &remote_sequence()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(
      err.to_string().contains("unsupported schema 1 for remove_book"),
      "{err}"
    );
    assert_eq!(remote_counter(&ctx).await, Some(0));
    assert_eq!(book_uuid(&ctx, "js").await.as_deref(), Some("js-local"));
  }

  #[tokio::test]
  async fn swapped_server_uuids_are_adopted() {
    let addr = serve(vec![remote("uuid-2", "js"), remote("uuid-1", "css")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;

    ctx.store.insert_book("uuid-1", "js").await.unwrap();
    ctx.store.insert_book("uuid-2", "css").await.unwrap();
    insert(&ctx, "a1", 3, ActionType::AddNote, json!({
      "note_uuid": "note-1-uuid", "book_uuid": "uuid-1", "content": "n", "public": false
    }))
    .await;

    run(&ctx, Track::Remote, &remote_sequence()).await.unwrap();

    assert_eq!(remote_counter(&ctx).await, Some(1));
    assert_eq!(book_uuid(&ctx, "js").await.as_deref(), Some("uuid-2"));
    assert_eq!(book_uuid(&ctx, "css").await.as_deref(), Some("uuid-1"));
    let a1: AddNoteDataV3 = action(&ctx, "a1").await.decode().unwrap();
    assert_eq!(a1.book_uuid, "uuid-2");
  }

  #[tokio::test]
  async fn runs_once_per_device() {
    let addr = serve(vec![remote("server-js", "js")]).await;
    let ctx = context(format!("http://{addr}"), Some(API_KEY)).await;
    ctx.store.insert_book("js-local", "js").await.unwrap();

    run(&ctx, Track::Remote, &remote_sequence()).await.unwrap();
    // A book created after reconciliation keeps its local uuid on later runs.
    ctx.store.insert_book("rust-local", "rust").await.unwrap();
    run(&ctx, Track::Remote, &remote_sequence()).await.unwrap();

    assert_eq!(remote_counter(&ctx).await, Some(1));
    assert_eq!(book_uuid(&ctx, "rust").await.as_deref(), Some("rust-local"));
  }
}
