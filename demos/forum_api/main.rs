//! Forum API example with field selection
//!
//! This example demonstrates:
//! - Declaring fieldsets for members, topics, posts, albums and messages
//! - Nested fields with a plain key fallback (`author` renders as an id)
//! - Member dereference (`from`/`to` render the member's name)
//! - Always-embedded lazy objects (message `body`)
//! - Synthesized picture URLs
//! - limit/offset paging on listings
//!
//! Set `FIELDSETS_CONFIG` to a YAML file to override defaults per fieldset.

use fieldsets::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// =============================================================================
// Data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Member {
    id: u64,
    name: String,
    posts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Topic {
    tid: u64,
    title: String,
    last_post: i64,
    last_poster_name: String,
    starter: Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Post {
    pid: u64,
    tid: u64,
    post: String,
    post_date: i64,
    author: Option<Member>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Picture {
    pid: u64,
    album_id: u64,
    hits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Album {
    a_id: u64,
    title: String,
    a_date: String,
    a_location: Option<String>,
    a_desc: Option<String>,
    thumbnail: Option<Picture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageBody {
    msg_id: u64,
    msg_post: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    mt_id: u64,
    mt_title: String,
    mt_date: i64,
    mt_vid_folder: String,
    from_user: Member,
    to_user: Member,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<MessageBody>,
}

struct Forum {
    members: Vec<Member>,
    topics: Vec<Topic>,
    posts: Vec<Post>,
    albums: Vec<Album>,
    messages: Vec<Message>,
}

impl Forum {
    fn seed() -> Self {
        let alice = Member {
            id: 1,
            name: "Alice".to_string(),
            posts: 2,
        };
        let bob = Member {
            id: 2,
            name: "Bob".to_string(),
            posts: 1,
        };

        let topics = vec![
            Topic {
                tid: 10,
                title: "Welcome".to_string(),
                last_post: 1_700_000_300,
                last_poster_name: bob.name.clone(),
                starter: alice.clone(),
            },
            Topic {
                tid: 11,
                title: "Summer camp".to_string(),
                last_post: 1_700_100_000,
                last_poster_name: alice.name.clone(),
                starter: bob.clone(),
            },
        ];

        let posts = vec![
            Post {
                pid: 100,
                tid: 10,
                post: "Hello everyone!".to_string(),
                post_date: 1_700_000_000,
                author: Some(alice.clone()),
            },
            Post {
                pid: 101,
                tid: 10,
                post: "Grüß dich, Alice".to_string(),
                post_date: 1_700_000_300,
                author: Some(bob.clone()),
            },
            Post {
                pid: 102,
                tid: 11,
                post: "Who is coming?".to_string(),
                post_date: 1_700_100_000,
                author: None,
            },
        ];

        let albums = vec![Album {
            a_id: 5,
            title: "Camp 2023".to_string(),
            a_date: "2023-07-14".to_string(),
            a_location: Some("Lake".to_string()),
            a_desc: None,
            thumbnail: Some(Picture {
                pid: 500,
                album_id: 5,
                hits: 42,
            }),
        }];

        let messages = vec![
            Message {
                mt_id: 900,
                mt_title: "Camp schedule".to_string(),
                mt_date: 1_700_200_000,
                mt_vid_folder: "in".to_string(),
                from_user: bob.clone(),
                to_user: alice.clone(),
                body: Some(MessageBody {
                    msg_id: 9000,
                    msg_post: "See attachment".to_string(),
                }),
            },
            Message {
                mt_id: 901,
                mt_title: "Re: Camp schedule".to_string(),
                mt_date: 1_700_200_500,
                mt_vid_folder: "sent".to_string(),
                from_user: alice.clone(),
                to_user: bob.clone(),
                body: None,
            },
        ];

        Self {
            members: vec![alice, bob],
            topics,
            posts,
            albums,
            messages,
        }
    }
}

// =============================================================================
// Fieldsets
// =============================================================================

struct MemberFields;

impl FieldsetType for MemberFields {
    const NAME: &'static str = "member";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("id", LeafField::integer())
            .field("name", LeafField::string())
            .field("post_count", LeafField::integer().attribute("posts"))
    }
}

struct TopicFields;

impl FieldsetType for TopicFields {
    const NAME: &'static str = "topic";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("tid", LeafField::integer())
            .field("title", LeafField::string())
            .field("last_post", LeafField::datetime(DateFormat::Iso8601))
            .field("last_poster_name", LeafField::string())
            .nested(
                "starter",
                NestedDecl::of::<MemberFields>().plain_key("name"),
            )
            .meta(FieldsetMeta::new().default_embed(Vec::<String>::new()))
    }
}

struct PostFields;

impl FieldsetType for PostFields {
    const NAME: &'static str = "post";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("pid", LeafField::integer())
            .field("post", LeafField::string())
            .field("post_date", LeafField::datetime(DateFormat::Rfc822))
            .nested(
                "author",
                NestedDecl::of::<MemberFields>()
                    .plain_key("id")
                    .allow_null(true),
            )
            .meta(FieldsetMeta::new().default_embed(Vec::<String>::new()))
    }
}

struct PictureFields;

impl PictureFields {
    const THUMB: &'static str = "bt";
    const THUMB_SMALL: &'static str = "st";
    const THUMB_SQUARE: &'static str = "sq";

    fn url(format: Option<&str>) -> LeafField {
        let template = match format {
            Some(format) => format!("/pictures/{{value}}/{}", format),
            None => "/pictures/{value}".to_string(),
        };
        LeafField::template(template).attribute("pid")
    }
}

impl FieldsetType for PictureFields {
    const NAME: &'static str = "picture";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("id", LeafField::integer().attribute("pid"))
            .field("album_id", LeafField::integer())
            .field("hits", LeafField::integer())
            .field("url", Self::url(None))
            .field("thumb_small_url", Self::url(Some(Self::THUMB_SMALL)))
            .field("thumb_square_url", Self::url(Some(Self::THUMB_SQUARE)))
            .field("thumb_url", Self::url(Some(Self::THUMB)))
            .meta(FieldsetMeta::new().default_fields(["id", "url", "thumb_url"]))
    }
}

struct AlbumFields;

impl FieldsetType for AlbumFields {
    const NAME: &'static str = "album";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("id", LeafField::integer().attribute("a_id"))
            .field("title", LeafField::string())
            .nested(
                "thumbnail",
                NestedDecl::of::<PictureFields>()
                    .plain_key("pid")
                    .allow_null(true),
            )
            .field("date", LeafField::string().attribute("a_date"))
            .field("location_name", LeafField::string().attribute("a_location"))
            .field("description", LeafField::string().attribute("a_desc"))
    }
}

struct BodyFields;

impl FieldsetType for BodyFields {
    const NAME: &'static str = "message_body";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("id", LeafField::integer().attribute("msg_id"))
            .field("text", LeafField::string().attribute("msg_post"))
    }
}

/// Messages embed the body lazily: listings usually omit it
fn message_fields(body: &Fieldset) -> FieldsetDef {
    FieldsetDef::new("message")
        .field("id", LeafField::integer().attribute("mt_id"))
        .field("title", LeafField::string().attribute("mt_title"))
        .field("date", LeafField::integer().attribute("mt_date"))
        .field("from", LeafField::member("name").attribute("from_user"))
        .field("to", LeafField::member("name").attribute("to_user"))
        .field("folder", LeafField::string().attribute("mt_vid_folder"))
        .field("body", LeafField::lazy(body))
}

// =============================================================================
// Handlers
// =============================================================================

type AppState = Arc<Forum>;

async fn list_members(State(forum): State<AppState>) -> Json<Vec<Member>> {
    Json(forum.members.clone())
}

async fn list_topics(
    State(forum): State<AppState>,
    Query(limits): Query<LimitParams>,
) -> Json<Vec<Topic>> {
    Json(limits.apply(forum.topics.clone()))
}

async fn get_topic(
    State(forum): State<AppState>,
    Path(tid): Path<u64>,
) -> Result<Json<Topic>, (StatusCode, Json<Value>)> {
    forum
        .topics
        .iter()
        .find(|t| t.tid == tid)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Topic not found" })),
            )
        })
}

async fn list_posts(
    State(forum): State<AppState>,
    Path(tid): Path<u64>,
    Query(limits): Query<LimitParams>,
) -> Json<Vec<Post>> {
    let posts: Vec<Post> = forum
        .posts
        .iter()
        .filter(|p| p.tid == tid)
        .cloned()
        .collect();
    Json(limits.apply(posts))
}

async fn list_albums(State(forum): State<AppState>) -> Json<Vec<Album>> {
    Json(forum.albums.clone())
}

async fn list_messages(
    State(forum): State<AppState>,
    Query(limits): Query<LimitParams>,
) -> Json<Vec<Message>> {
    Json(limits.apply(forum.messages.clone()))
}

// =============================================================================
// Server
// =============================================================================

fn load_config() -> Result<FieldsetsConfig> {
    match std::env::var("FIELDSETS_CONFIG") {
        Ok(path) => FieldsetsConfig::from_yaml_file(&path),
        Err(_) => Ok(FieldsetsConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = Arc::new(load_config()?);
    let registry = FieldsetRegistry::new(config);

    // Build every schema up front so declaration errors stop startup
    registry
        .register::<MemberFields>()?
        .register::<TopicFields>()?
        .register::<PostFields>()?
        .register::<AlbumFields>()?;
    let body = registry.get::<BodyFields>()?;
    let messages = MarshalLayer::new(registry.build(message_fields(&body))?);

    tracing::info!(schemas = ?registry.names(), "fieldsets ready");

    let app = Router::new()
        .route(
            "/members",
            get(list_members).layer(registry.layer::<MemberFields>()?),
        )
        .route(
            "/topics",
            get(list_topics).layer(registry.layer::<TopicFields>()?),
        )
        .route(
            "/topics/{tid}",
            get(get_topic).layer(registry.layer::<TopicFields>()?),
        )
        .route(
            "/topics/{tid}/posts",
            get(list_posts).layer(registry.layer::<PostFields>()?),
        )
        .route(
            "/albums",
            get(list_albums).layer(registry.layer::<AlbumFields>()?),
        )
        .route("/messages", get(list_messages).layer(messages))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(Forum::seed()));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Try: curl 'http://{}/topics?embedd=starter'", addr);
    tracing::info!(
        "Try: curl 'http://{}/topics/10/posts?fields=pid,author,author.name&embedd=author'",
        addr
    );
    tracing::info!("Try: curl 'http://{}/messages?fields=title,from,body&limit=1'", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
