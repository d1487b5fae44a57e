use crate::store::EntityKind;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Identity searches are recorded under.
    /// Defaults to $USER
    #[clap(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn user_id(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|user| !user.trim().is_empty())
            .unwrap_or_else(|| "cli".to_string())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the http server
    Daemon {
        /// Address to listen on, overrides config
        #[clap(long)]
        listen: Option<String>,
    },

    /// Search recent news with the configured AI provider
    News { query: String },

    /// Semantic search over stored posts or users
    Search {
        #[clap(value_enum)]
        kind: EntityKind,

        query: String,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,

        /// Minimum similarity in [0, 1]
        #[clap(short, long)]
        threshold: Option<f32>,
    },

    /// Store a post and index it for search
    AddPost {
        #[clap(short, long)]
        author: String,

        #[clap(short, long)]
        content: String,

        /// Replace the post with this id
        #[clap(long)]
        id: Option<String>,
    },

    /// Store a user and index it for search
    AddUser {
        #[clap(short, long)]
        username: String,

        #[clap(short, long, default_value = "")]
        email: String,

        /// Replace the user with this id
        #[clap(long)]
        id: Option<String>,
    },

    /// Show past searches, newest first
    History {
        #[clap(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print the cosine similarity between two texts
    Compare { a: String, b: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let args = Args::parse_from([
            "feedscout", "--user", "alice", "search", "post", "cats", "--limit", "3",
        ]);
        assert_eq!(args.user_id(), "alice");
        match args.command {
            Command::Search {
                kind, query, limit, threshold,
            } => {
                assert_eq!(kind, EntityKind::Post);
                assert_eq!(query, "cats");
                assert_eq!(limit, Some(3));
                assert_eq!(threshold, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_add_user() {
        let args = Args::parse_from(["feedscout", "add-user", "-u", "bob"]);
        match args.command {
            Command::AddUser { username, email, id } => {
                assert_eq!(username, "bob");
                assert_eq!(email, "");
                assert!(id.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(Args::try_parse_from(["feedscout", "search", "comment", "x"]).is_err());
    }
}
