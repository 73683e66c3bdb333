//! CLI commands

use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use konata_core::ClientSettings;
use konata_http::ApiResponse;
use konata_http::client::{
    BlogClient, CategoryQuery, FilePart, MediaQuery, MediaUpload, PageParams, PostSearch,
    Session, Sort,
};
use konata_http::types::MediaType;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the issued token
    Login {
        username: String,

        /// Password (prompting is not supported; prefer the environment variable)
        #[arg(long, env = "KONATA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and forget the stored token
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Post operations
    Posts {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Category operations
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Tag operations
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Media library operations
    Media {
        #[command(subcommand)]
        command: MediaCommands,
    },

    /// Blog settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Theme operations
    Themes {
        #[command(subcommand)]
        command: ThemeCommands,
    },

    /// Show the effective client configuration
    Config,
}

#[derive(Subcommand)]
pub enum PostCommands {
    /// List posts
    List {
        #[command(flatten)]
        paging: PagingArgs,

        /// Include drafts (admin listing)
        #[arg(long)]
        all: bool,
    },

    /// Show a post by numeric id or slug
    Show {
        id_or_slug: String,

        /// Use the admin endpoints (drafts visible)
        #[arg(long)]
        admin: bool,
    },

    /// Search posts
    Search {
        /// Search text
        #[arg(default_value = "")]
        query: String,

        /// Restrict to a category id
        #[arg(long)]
        category: Option<i64>,

        /// Restrict to a tag id
        #[arg(long)]
        tag: Option<i64>,

        #[command(flatten)]
        paging: PagingArgs,

        /// Include drafts (admin search)
        #[arg(long)]
        admin: bool,
    },

    /// Publish a draft
    Publish { id: i64 },

    /// Move a post back to drafts
    Unpublish { id: i64 },

    /// Delete a post
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Include post counts
        #[arg(long)]
        counts: bool,

        /// Only children of this category
        #[arg(long)]
        parent: Option<i64>,

        /// Show the hierarchy instead of a flat list
        #[arg(long, conflicts_with_all = ["counts", "parent"])]
        tree: bool,
    },

    /// Show category statistics
    Stats,
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// List all tags
    List,

    /// Most used tags
    Popular {
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Search tags by name
    Search {
        #[arg(default_value = "")]
        query: String,

        #[arg(long, default_value = "0")]
        page: u32,

        #[arg(long, default_value = "20")]
        size: u32,

        /// Match case exactly
        #[arg(long)]
        case_sensitive: bool,
    },
}

#[derive(Subcommand)]
pub enum MediaCommands {
    /// List uploaded media
    List {
        #[command(flatten)]
        paging: PagingArgs,

        /// Filter by kind (image, video, audio, avatar)
        #[arg(long = "type", value_parser = parse_media_type)]
        media_type: Option<MediaType>,
    },

    /// Upload a file
    Upload {
        path: PathBuf,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        alt_text: Option<String>,

        /// Kind of media (image, video, audio, avatar)
        #[arg(long = "type", value_parser = parse_media_type)]
        media_type: Option<MediaType>,

        /// MIME type sent for the file part
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Delete an uploaded file
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show blog settings
    Show {
        /// Show the raw admin settings table
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum ThemeCommands {
    /// List installed themes
    List,

    /// Activate a theme
    Activate { id: i64 },
}

#[derive(clap::Args)]
pub struct PagingArgs {
    /// Zero-based page number
    #[arg(long)]
    page: Option<u32>,

    /// Page size
    #[arg(long)]
    size: Option<u32>,

    /// Sort key, e.g. `publishedAt,desc`
    #[arg(long)]
    sort: Option<Sort>,
}

impl From<PagingArgs> for PageParams {
    fn from(args: PagingArgs) -> Self {
        Self {
            page: args.page,
            size: args.size,
            sort: args.sort,
        }
    }
}

fn parse_media_type(value: &str) -> Result<MediaType, String> {
    match value.to_ascii_lowercase().as_str() {
        "image" => Ok(MediaType::Image),
        "video" => Ok(MediaType::Video),
        "audio" => Ok(MediaType::Audio),
        "avatar" => Ok(MediaType::Avatar),
        other => Err(format!("unknown media type: {other}")),
    }
}

/// Print an envelope as pretty JSON; a failed envelope fails the command
fn print_envelope<T: Serialize>(response: &ApiResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if response.success {
        Ok(())
    } else {
        Err(anyhow!(
            "{}",
            response.error_message().unwrap_or("Request failed")
        ))
    }
}

impl Commands {
    pub async fn execute(self, settings: &ClientSettings) -> Result<()> {
        if matches!(self, Self::Config) {
            print!("{}", config::render_settings(settings)?);
            return Ok(());
        }

        let client = BlogClient::from_settings(settings).context("creating client")?;
        debug!(token_file = %settings.token_path().display(), "client ready");

        match self {
            Self::Login { username, password } => {
                let session = Session::new(client);
                let user = session.login(&username, &password).await?;
                info!(username = %user.username, "logged in");
                println!("{}", serde_json::to_string_pretty(&user)?);
                Ok(())
            }
            Self::Logout => {
                client.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Self::Whoami => {
                let session = Session::new(client);
                match session.refresh_user().await {
                    Some(user) => {
                        println!("{}", serde_json::to_string_pretty(&user)?);
                        Ok(())
                    }
                    None => bail!("not logged in"),
                }
            }
            Self::Posts { command } => command.execute(&client).await,
            Self::Categories { command } => command.execute(&client).await,
            Self::Tags { command } => command.execute(&client).await,
            Self::Media { command } => command.execute(&client).await,
            Self::Settings { command } => command.execute(&client).await,
            Self::Themes { command } => command.execute(&client).await,
            Self::Config => Ok(()),
        }
    }
}

impl PostCommands {
    pub async fn execute(self, client: &BlogClient) -> Result<()> {
        match self {
            Self::List { paging, all } => {
                let paging = PageParams::from(paging);
                if all {
                    print_envelope(&client.get_admin_posts(&paging).await?)
                } else {
                    print_envelope(&client.get_posts(&paging).await?)
                }
            }
            Self::Show { id_or_slug, admin } => {
                let response = match (id_or_slug.parse::<i64>(), admin) {
                    (Ok(id), false) => client.get_post_by_id(id).await?,
                    (Ok(id), true) => client.get_admin_post_by_id(id).await?,
                    (Err(_), false) => client.get_post_by_slug(&id_or_slug).await?,
                    (Err(_), true) => client.get_admin_post_by_slug(&id_or_slug).await?,
                };
                print_envelope(&response)
            }
            Self::Search {
                query,
                category,
                tag,
                paging,
                admin,
            } => {
                let search = PostSearch {
                    q: Some(query),
                    category,
                    tag,
                    paging: paging.into(),
                };
                if admin {
                    print_envelope(&client.search_admin_posts(&search).await?)
                } else {
                    print_envelope(&client.search_posts(&search).await?)
                }
            }
            Self::Publish { id } => print_envelope(&client.publish_post(id).await?),
            Self::Unpublish { id } => print_envelope(&client.unpublish_post(id).await?),
            Self::Delete { id } => print_envelope(&client.delete_post(id).await?),
        }
    }
}

impl CategoryCommands {
    pub async fn execute(self, client: &BlogClient) -> Result<()> {
        match self {
            Self::List { tree: true, .. } => print_envelope(&client.get_category_tree(false).await?),
            Self::List { counts, parent, .. } => {
                let query = CategoryQuery {
                    include_counts: counts.then_some(true),
                    parent_id: parent,
                };
                print_envelope(&client.get_categories(query).await?)
            }
            Self::Stats => print_envelope(&client.get_category_stats().await?),
        }
    }
}

impl TagCommands {
    pub async fn execute(self, client: &BlogClient) -> Result<()> {
        match self {
            Self::List => print_envelope(&client.get_tags().await?),
            Self::Popular { limit } => print_envelope(&client.get_popular_tags(limit).await?),
            Self::Search {
                query,
                page,
                size,
                case_sensitive,
            } => print_envelope(
                &client
                    .search_tags(&query, page, size, !case_sensitive)
                    .await?,
            ),
        }
    }
}

impl MediaCommands {
    pub async fn execute(self, client: &BlogClient) -> Result<()> {
        match self {
            Self::List { paging, media_type } => {
                let query = MediaQuery {
                    paging: paging.into(),
                    media_type,
                    uploaded_by: None,
                };
                print_envelope(&client.get_media(&query).await?)
            }
            Self::Upload {
                path,
                description,
                alt_text,
                media_type,
                content_type,
            } => {
                let mut file = FilePart::from_path(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                if let Some(content_type) = content_type {
                    file = file.with_content_type(content_type);
                }
                let metadata = MediaUpload {
                    description,
                    alt_text,
                    media_type,
                };
                print_envelope(&client.upload_media(file, metadata).await?)
            }
            Self::Delete { id } => print_envelope(&client.delete_media(id).await?),
        }
    }
}

impl SettingsCommands {
    pub async fn execute(self, client: &BlogClient) -> Result<()> {
        match self {
            Self::Show { all: true } => print_envelope(&client.get_all_settings().await?),
            Self::Show { all: false } => print_envelope(&client.get_public_settings().await?),
        }
    }
}

impl ThemeCommands {
    pub async fn execute(self, client: &BlogClient) -> Result<()> {
        match self {
            Self::List => print_envelope(&client.get_themes().await?),
            Self::Activate { id } => print_envelope(&client.activate_theme(id).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_type() {
        assert_eq!(parse_media_type("IMAGE"), Ok(MediaType::Image));
        assert_eq!(parse_media_type("avatar"), Ok(MediaType::Avatar));
        assert!(parse_media_type("gif").is_err());
    }

    #[test]
    fn test_paging_args_into_page_params() {
        let args = PagingArgs {
            page: Some(1),
            size: None,
            sort: Some(Sort::desc("publishedAt")),
        };
        let params = PageParams::from(args);
        assert_eq!(params.page, Some(1));
        assert_eq!(params.size, None);
        assert_eq!(params.sort, Some(Sort::desc("publishedAt")));
    }

    #[test]
    fn test_sort_flag_keeps_missing_direction() {
        #[derive(clap::Parser)]
        struct Paging {
            #[command(flatten)]
            paging: PagingArgs,
        }

        let parsed =
            <Paging as clap::Parser>::try_parse_from(["konata", "--sort", "title"]).unwrap();
        let params = PageParams::from(parsed.paging);
        assert_eq!(params.sort, Some(Sort::by("title")));
        assert_eq!(params.sort.unwrap().to_string(), "title");
    }
}
