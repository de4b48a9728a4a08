use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bpaf::Bpaf;
use cartalog_client::ClientTrait;
use cartalog_client::types::{CarColor, CarSummary, EngineType, ImageAttachment, Transmission};
use cartalog_sdk::models::admin::CarDraft;
use cartalog_sdk::models::catalog_page::CatalogItem;
use cartalog_sdk::models::result_renderer::{CarCard, format_price};
use indoc::formatdoc;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::utils::errors::format_client_error;
use crate::utils::message;

/// Fields of a car, all optional so they can override an existing car
#[derive(Debug, Bpaf, Clone, Default)]
pub struct CarFields {
    #[bpaf(long, argument("NAME"))]
    name: Option<String>,
    #[bpaf(long, argument("TEXT"))]
    description: Option<String>,
    #[bpaf(long("manufacturer"), argument("ID"))]
    manufacturer_id: Option<u64>,
    #[bpaf(long("category"), argument("ID"))]
    category_id: Option<u64>,
    #[bpaf(long, argument("PRICE"))]
    price: Option<f64>,
    /// May be repeated, replaces the colors of an existing car
    #[bpaf(long("color"), argument("COLOR"), many)]
    colors: Vec<CarColor>,
    #[bpaf(long, argument("NAME"))]
    transmission: Option<Transmission>,
    #[bpaf(long("engine"), argument("NAME"))]
    engine_type: Option<EngineType>,
    #[bpaf(long, argument("KM"))]
    mileage: Option<u64>,
    /// Release date as YYYY-MM-DD
    #[bpaf(long, argument("DATE"))]
    release_date: Option<String>,
    /// Link to an already hosted image, may be repeated
    #[bpaf(long("image-url"), argument("URL"), many)]
    image_urls: Vec<String>,
    /// Image file to upload, may be repeated
    #[bpaf(long("image"), argument("FILE"), many)]
    images: Vec<PathBuf>,
}

impl CarFields {
    /// Overwrite the draft with every field that was given.
    fn apply_to(&self, draft: &mut CarDraft) {
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(description) = &self.description {
            draft.description = description.clone();
        }
        if self.manufacturer_id.is_some() {
            draft.manufacturer_id = self.manufacturer_id;
        }
        if self.category_id.is_some() {
            draft.category_id = self.category_id;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if !self.colors.is_empty() {
            draft.colors = self.colors.clone();
        }
        if self.transmission.is_some() {
            draft.transmission = self.transmission;
        }
        if self.engine_type.is_some() {
            draft.engine_type = self.engine_type;
        }
        if self.mileage.is_some() {
            draft.mileage = self.mileage;
        }
        if let Some(release_date) = &self.release_date {
            draft.release_date = release_date.clone();
        }
        if !self.image_urls.is_empty() {
            draft.image_urls = self.image_urls.clone();
        }
    }

    async fn read_images(&self) -> Result<Vec<ImageAttachment>> {
        let mut attachments = Vec::with_capacity(self.images.len());
        for path in &self.images {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Could not read image {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            debug!(file_name, size = bytes.len(), "attaching image");
            attachments.push(ImageAttachment {
                file_name,
                mime: guess_mime(path).to_string(),
                bytes,
            });
        }
        Ok(attachments)
    }
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Bpaf, Clone)]
pub enum CarCommands {
    /// List every car
    #[bpaf(command)]
    List {
        /// Print the cars as JSON
        #[bpaf(long)]
        json: bool,
    },

    /// Show a single car
    #[bpaf(command)]
    Show {
        #[bpaf(positional("ID"))]
        id: u64,
    },

    /// Add a car to the catalog
    #[bpaf(command)]
    Create(#[bpaf(external(car_fields))] CarFields),

    /// Change a car, keeping every field that is not given
    #[bpaf(command)]
    Update {
        #[bpaf(external(car_fields))]
        fields: CarFields,
        #[bpaf(positional("ID"))]
        id: u64,
    },

    /// Remove a car from the catalog
    #[bpaf(command)]
    Delete {
        #[bpaf(positional("ID"))]
        id: u64,
    },
}

/// Everything known about a car, one attribute per line.
fn describe_car(car: &CarSummary) -> String {
    let item = CatalogItem::from(car.clone());
    let optional = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    formatdoc! {"
        #{id} {name}
        Price:         {price}
        Manufacturer:  {manufacturer}
        Category:      {category}
        Engine:        {engine}
        Transmission:  {transmission}
        Mileage:       {mileage}
        Colors:        {colors}
        Released:      {released}
        Images:        {images}
        {description}",
        id = item.id,
        name = item.name,
        price = format_price(item.price),
        manufacturer = item.manufacturer,
        category = item.category,
        engine = optional(item.engine),
        transmission = optional(item.transmission),
        mileage = optional(item.mileage.map(|km| format!("{km} km"))),
        colors = item.colors.iter().join(", "),
        released = optional(car.manufactured_date.map(|date| date.to_string())),
        images = item.image_urls.len(),
        description = item.description,
    }
}

impl CarCommands {
    #[instrument(name = "cars", skip_all)]
    pub async fn handle(self, client: &impl ClientTrait) -> Result<()> {
        match self {
            CarCommands::List { json } => {
                let cars = client
                    .cars()
                    .await
                    .map_err(|err| anyhow::anyhow!(format_client_error(&err)))?;
                let cards = cars
                    .into_iter()
                    .map(|car| CarCard::from(&CatalogItem::from(car)))
                    .collect::<Vec<_>>();
                if json {
                    println!("{}", serde_json::to_string_pretty(&cards)?);
                } else if cards.is_empty() {
                    message::plain("No cars found.");
                } else {
                    for card in cards {
                        println!("{card}");
                    }
                }
            },
            CarCommands::Show { id } => {
                let car = client
                    .car(id)
                    .await
                    .map_err(|err| anyhow::anyhow!(format_client_error(&err)))?;
                println!("{}", describe_car(&car));
            },
            CarCommands::Create(fields) => {
                let mut draft = CarDraft::default();
                fields.apply_to(&mut draft);
                let payload = draft.validate()?;
                let images = fields.read_images().await?;

                let car = client
                    .create_car(&payload, images)
                    .await
                    .map_err(|err| anyhow::anyhow!(format_client_error(&err)))?;
                message::created(format!("Created car #{} '{}'", car.id, car.name));
            },
            CarCommands::Update { fields, id } => {
                let mut draft = existing_draft(client, id).await?;
                fields.apply_to(&mut draft);
                let payload = draft.validate()?;
                let images = fields.read_images().await?;

                let car = client
                    .update_car(id, &payload, images)
                    .await
                    .map_err(|err| anyhow::anyhow!(format_client_error(&err)))?;
                message::updated(format!("Updated car #{} '{}'", car.id, car.name));
            },
            CarCommands::Delete { id } => {
                client
                    .delete_car(id)
                    .await
                    .map_err(|err| anyhow::anyhow!(format_client_error(&err)))?;
                message::deleted(format!("Deleted car #{id}"));
            },
        }
        Ok(())
    }
}

/// Load a car into a draft, resolving the display names it is listed with.
async fn existing_draft(client: &impl ClientTrait, id: u64) -> Result<CarDraft> {
    let (car, manufacturers, categories) =
        tokio::try_join!(client.car(id), client.manufacturers(), client.categories())
            .map_err(|err| anyhow::anyhow!(format_client_error(&err)))?;

    let manufacturer_id = manufacturers
        .iter()
        .find(|manufacturer| Some(&manufacturer.name) == car.supplier_name.as_ref())
        .map(|manufacturer| manufacturer.id);
    let category_id = categories
        .iter()
        .find(|category| Some(&category.name) == car.category_name.as_ref())
        .map(|category| category.id);

    Ok(CarDraft::from_existing(&car, manufacturer_id, category_id))
}

#[cfg(test)]
mod tests {
    use cartalog_client::types::{Category, Manufacturer};
    use cartalog_client::{MockClient, MockResponseKind};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::message::history::History;

    fn corolla() -> CarSummary {
        CarSummary {
            id: 9,
            name: "Corolla".to_string(),
            description: "Reliable".to_string(),
            supplier_name: Some("Toyota".to_string()),
            category_name: Some("Sedan".to_string()),
            price: 18000.0,
            car_colors: vec![CarColor::White],
            color_code: None,
            transmission: Some(Transmission::Manual),
            transmission_description: None,
            engine_type: Some(EngineType::Hybrid),
            engine_description: None,
            mileage: Some(1200),
            image_urls: vec![],
            manufactured_date: NaiveDate::from_ymd_opt(2021, 3, 4),
            created_at: None,
            updated_at: None,
            deleted: false,
        }
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("car.webp")), "image/webp");
        assert_eq!(guess_mime(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn car_details() {
        let details = describe_car(&corolla());
        assert!(details.starts_with("#9 Corolla\nPrice:         $18,000\n"), "{details}");
        assert!(details.contains("Mileage:       1200 km"));
        assert!(details.contains("Released:      2021-03-04"));
    }

    #[tokio::test]
    async fn create_validates_before_sending() {
        let client = MockClient::default();
        let fields = CarFields {
            name: Some("Corolla".to_string()),
            ..Default::default()
        };

        let err = CarCommands::Create(fields).handle(&client).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please fill in all required fields: manufacturer, category, release date"
        );
    }

    #[tokio::test]
    async fn update_keeps_existing_fields() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Car(corolla()));
        client.push_response(MockResponseKind::Manufacturers(vec![Manufacturer {
            id: 4,
            name: "Toyota".to_string(),
            email: String::new(),
            address: String::new(),
            website: String::new(),
            phone: String::new(),
        }]));
        client.push_response(MockResponseKind::Categories(vec![Category {
            id: 2,
            name: "Sedan".to_string(),
            description: String::new(),
        }]));

        let mut draft = existing_draft(&client, 9).await.unwrap();
        CarFields {
            price: Some(17500.0),
            ..Default::default()
        }
        .apply_to(&mut draft);
        let payload = draft.validate().unwrap();

        assert_eq!(payload.supplier_id, 4);
        assert_eq!(payload.category_id, 2);
        assert_eq!(payload.price, 17500.0);
        assert_eq!(payload.car_colors, vec![CarColor::White]);
        assert_eq!(payload.name, "Corolla");
    }

    #[tokio::test]
    async fn delete_reports() {
        let client = MockClient::default();
        client.push_response(MockResponseKind::Deleted);
        History::global().clear();

        CarCommands::Delete { id: 3 }.handle(&client).await.unwrap();
        assert_eq!(&History::global().messages(), &["🗑️  Deleted car #3"]);
    }

    #[tokio::test]
    async fn missing_car_is_reported() {
        let client = MockClient::default();
        client.push_error_response(404, "Car not found");

        let err = CarCommands::Show { id: 3 }.handle(&client).await.unwrap_err();
        assert_eq!(err.to_string(), "Car not found");
    }
}
