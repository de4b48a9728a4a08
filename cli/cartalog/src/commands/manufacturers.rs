use anyhow::{Result, anyhow};
use bpaf::Bpaf;
use cartalog_client::types::Manufacturer;
use cartalog_client::{CatalogClientError, ClientTrait};
use cartalog_sdk::models::admin::ManufacturerDraft;
use indoc::formatdoc;
use tracing::instrument;

use crate::utils::errors::format_client_error;
use crate::utils::message;

/// Contact details of a manufacturer
#[derive(Debug, Bpaf, Clone, Default)]
pub struct ManufacturerFields {
    #[bpaf(long, argument("NAME"))]
    name: Option<String>,
    #[bpaf(long, argument("EMAIL"))]
    email: Option<String>,
    #[bpaf(long, argument("ADDRESS"))]
    address: Option<String>,
    /// Must start with http:// or https://
    #[bpaf(long, argument("URL"))]
    website: Option<String>,
    #[bpaf(long, argument("PHONE"))]
    phone: Option<String>,
}

impl ManufacturerFields {
    fn into_draft(self, existing: ManufacturerDraft) -> ManufacturerDraft {
        ManufacturerDraft {
            name: self.name.unwrap_or(existing.name),
            email: self.email.unwrap_or(existing.email),
            address: self.address.unwrap_or(existing.address),
            website: self.website.unwrap_or(existing.website),
            phone: self.phone.unwrap_or(existing.phone),
        }
    }
}

#[derive(Debug, Bpaf, Clone)]
pub enum ManufacturerCommands {
    /// List every manufacturer
    #[bpaf(command)]
    List {
        /// Print the manufacturers as JSON
        #[bpaf(long)]
        json: bool,
    },

    /// Show the contact details of a manufacturer
    #[bpaf(command)]
    Show {
        #[bpaf(positional("ID"))]
        id: u64,
    },

    /// Add a manufacturer
    #[bpaf(command)]
    Create(#[bpaf(external(manufacturer_fields))] ManufacturerFields),

    /// Change a manufacturer, keeping what is not given
    #[bpaf(command)]
    Update {
        #[bpaf(external(manufacturer_fields))]
        fields: ManufacturerFields,
        #[bpaf(positional("ID"))]
        id: u64,
    },

    /// Remove a manufacturer
    #[bpaf(command)]
    Delete {
        #[bpaf(positional("ID"))]
        id: u64,
    },
}

fn describe(manufacturer: &Manufacturer) -> String {
    formatdoc! {"
        #{id} {name}
        Email:    {email}
        Address:  {address}
        Website:  {website}
        Phone:    {phone}",
        id = manufacturer.id,
        name = manufacturer.name,
        email = manufacturer.email,
        address = manufacturer.address,
        website = manufacturer.website,
        phone = manufacturer.phone,
    }
}

impl ManufacturerCommands {
    #[instrument(name = "manufacturers", skip_all)]
    pub async fn handle(self, client: &impl ClientTrait) -> Result<()> {
        let client_error = |err: CatalogClientError| anyhow!(format_client_error(&err));

        match self {
            ManufacturerCommands::List { json } => {
                let manufacturers = client.manufacturers().await.map_err(client_error)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&manufacturers)?);
                } else if manufacturers.is_empty() {
                    message::plain("No manufacturers yet.");
                } else {
                    for manufacturer in &manufacturers {
                        println!("#{} {}", manufacturer.id, manufacturer.name);
                    }
                }
            },
            ManufacturerCommands::Show { id } => {
                let manufacturer = client.manufacturer(id).await.map_err(client_error)?;
                println!("{}", describe(&manufacturer));
            },
            ManufacturerCommands::Create(fields) => {
                let payload = fields.into_draft(ManufacturerDraft::default()).validate()?;
                let manufacturer = client
                    .create_manufacturer(&payload)
                    .await
                    .map_err(client_error)?;
                message::created(format!(
                    "Created manufacturer #{} '{}'",
                    manufacturer.id, manufacturer.name
                ));
            },
            ManufacturerCommands::Update { fields, id } => {
                let existing = client.manufacturer(id).await.map_err(client_error)?;
                let existing = ManufacturerDraft {
                    name: existing.name,
                    email: existing.email,
                    address: existing.address,
                    website: existing.website,
                    phone: existing.phone,
                };
                let payload = fields.into_draft(existing).validate()?;
                let manufacturer = client
                    .update_manufacturer(id, &payload)
                    .await
                    .map_err(client_error)?;
                message::updated(format!(
                    "Updated manufacturer #{} '{}'",
                    manufacturer.id, manufacturer.name
                ));
            },
            ManufacturerCommands::Delete { id } => {
                client.delete_manufacturer(id).await.map_err(client_error)?;
                message::deleted(format!("Deleted manufacturer #{id}"));
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

    fn toyota() -> Manufacturer {
        Manufacturer {
            id: 4,
            name: "Toyota".to_string(),
            email: "info@toyota.jp".to_string(),
            address: "Toyota City".to_string(),
            website: "https://toyota.jp".to_string(),
            phone: "+81 565 28 2121".to_string(),
        }
    }

    #[test]
    fn details_are_listed() {
        assert_eq!(
            describe(&toyota()),
            "#4 Toyota\nEmail:    info@toyota.jp\nAddress:  Toyota City\nWebsite:  https://toyota.jp\nPhone:    +81 565 28 2121"
        );
    }

    #[tokio::test]
    async fn create_checks_website() {
        let client = MockClient::default();
        let fields = ManufacturerFields {
            name: Some("Toyota".to_string()),
            email: Some("info@toyota.jp".to_string()),
            address: Some("Toyota City".to_string()),
            website: Some("toyota.jp".to_string()),
            phone: Some("1".to_string()),
        };

        let err = ManufacturerCommands::Create(fields)
            .handle(&client)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please enter a valid website URL (starting with http:// or https://)"
        );
    }

    #[tokio::test]
    async fn update_only_changes_given_fields() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Manufacturer(toyota()));
        client.push_response(MockResponseKind::Manufacturer(toyota()));
        History::global().clear();

        ManufacturerCommands::Update {
            fields: ManufacturerFields {
                phone: Some("+81 1".to_string()),
                ..Default::default()
            },
            id: 4,
        }
        .handle(&client)
        .await
        .unwrap();

        assert_eq!(&History::global().messages(), &[
            "✅ Updated manufacturer #4 'Toyota'"
        ]);
    }

    #[test]
    fn fields_override_existing() {
        let draft = ManufacturerFields {
            email: Some("sales@toyota.jp".to_string()),
            ..Default::default()
        }
        .into_draft(ManufacturerDraft {
            name: "Toyota".to_string(),
            email: "info@toyota.jp".to_string(),
            ..Default::default()
        });
        assert_eq!(draft.name, "Toyota");
        assert_eq!(draft.email, "sales@toyota.jp");
    }
}
