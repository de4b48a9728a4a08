use anyhow::{Result, anyhow};
use bpaf::Bpaf;
use cartalog_client::{CatalogClientError, ClientTrait};
use cartalog_client::types::Category;
use cartalog_sdk::models::admin::CategoryDraft;
use tracing::instrument;

use crate::utils::errors::format_client_error;
use crate::utils::message;

#[derive(Debug, Bpaf, Clone)]
pub enum CategoryCommands {
    /// List every category
    #[bpaf(command)]
    List {
        /// Print the categories as JSON
        #[bpaf(long)]
        json: bool,
    },

    /// Show a single category
    #[bpaf(command)]
    Show {
        #[bpaf(positional("ID"))]
        id: u64,
    },

    /// Add a category
    #[bpaf(command)]
    Create {
        #[bpaf(long, argument("NAME"))]
        name: String,
        #[bpaf(long, argument("TEXT"))]
        description: String,
    },

    /// Rename or describe a category, keeping what is not given
    #[bpaf(command)]
    Update {
        #[bpaf(long, argument("NAME"))]
        name: Option<String>,
        #[bpaf(long, argument("TEXT"))]
        description: Option<String>,
        #[bpaf(positional("ID"))]
        id: u64,
    },

    /// Remove a category
    #[bpaf(command)]
    Delete {
        #[bpaf(positional("ID"))]
        id: u64,
    },
}

fn describe(category: &Category) -> String {
    if category.description.is_empty() {
        format!("#{} {}", category.id, category.name)
    } else {
        format!("#{} {}: {}", category.id, category.name, category.description)
    }
}

impl CategoryCommands {
    #[instrument(name = "categories", skip_all)]
    pub async fn handle(self, client: &impl ClientTrait) -> Result<()> {
        let client_error = |err: CatalogClientError| anyhow!(format_client_error(&err));

        match self {
            CategoryCommands::List { json } => {
                let categories = client.categories().await.map_err(client_error)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&categories)?);
                } else if categories.is_empty() {
                    message::plain("No categories yet.");
                } else {
                    for category in &categories {
                        println!("{}", describe(category));
                    }
                }
            },
            CategoryCommands::Show { id } => {
                let category = client.category(id).await.map_err(client_error)?;
                println!("{}", describe(&category));
            },
            CategoryCommands::Create { name, description } => {
                let payload = CategoryDraft { name, description }.validate()?;
                let category = client
                    .create_category(&payload)
                    .await
                    .map_err(client_error)?;
                message::created(format!(
                    "Created category #{} '{}'",
                    category.id, category.name
                ));
            },
            CategoryCommands::Update {
                name,
                description,
                id,
            } => {
                let existing = client.category(id).await.map_err(client_error)?;
                let draft = CategoryDraft {
                    name: name.unwrap_or(existing.name),
                    description: description.unwrap_or(existing.description),
                };
                let payload = draft.validate()?;
                let category = client
                    .update_category(id, &payload)
                    .await
                    .map_err(client_error)?;
                message::updated(format!(
                    "Updated category #{} '{}'",
                    category.id, category.name
                ));
            },
            CategoryCommands::Delete { id } => {
                client.delete_category(id).await.map_err(client_error)?;
                message::deleted(format!("Deleted category #{id}"));
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cartalog_client::{MockClient, MockResponseKind};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::message::history::History;

    fn suv() -> Category {
        Category {
            id: 5,
            name: "SUV".to_string(),
            description: "Sport utility".to_string(),
        }
    }

    #[test]
    fn description_is_optional_in_listing() {
        assert_eq!(describe(&suv()), "#5 SUV: Sport utility");
        assert_eq!(
            describe(&Category {
                description: String::new(),
                ..suv()
            }),
            "#5 SUV"
        );
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        let client = MockClient::default();
        let err = CategoryCommands::Create {
            name: "SUV".to_string(),
            description: " ".to_string(),
        }
        .handle(&client)
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Please fill in all required fields: description"
        );
        assert_eq!(client.remaining_responses(), 0);
    }

    #[tokio::test]
    async fn update_reads_before_writing() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Category(suv()));
        client.push_response(MockResponseKind::Category(Category {
            name: "Crossover".to_string(),
            ..suv()
        }));
        History::global().clear();

        CategoryCommands::Update {
            name: Some("Crossover".to_string()),
            description: None,
            id: 5,
        }
        .handle(&client)
        .await
        .unwrap();

        assert_eq!(client.remaining_responses(), 0);
        assert_eq!(&History::global().messages(), &[
            "✅ Updated category #5 'Crossover'"
        ]);
    }

    #[tokio::test]
    async fn delete_needs_login() {
        let client = MockClient::default();
        client.push_error_response(401, "");

        let err = CategoryCommands::Delete { id: 5 }
            .handle(&client)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cartalog auth login"), "{err}");
    }
}
