use crate::envelope;
use crate::error::BillyError;
use crate::models::{Contact, ContactFilter, ContactPerson, ContactType, ContactUpdate, NewContact};
use crate::request::{with_query, ApiRequest};
use crate::BillyClient;
use serde_json::{json, Map, Value};

const DEFAULT_COUNTRY: &str = "DK";

impl BillyClient {
    pub async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, BillyError> {
        let mut query = Vec::new();
        if let Some(name) = &filter.name {
            query.push(("name", name.clone()));
        }
        if let Some(contact_type) = filter.contact_type {
            query.push(("type", contact_type_str(contact_type).to_string()));
        }

        let endpoint = with_query("/contacts", &query);
        let response = self.send(ApiRequest::get(&endpoint)).await?;
        Ok(envelope::list(&endpoint, &response.body, "contacts"))
    }

    pub async fn get_contact(&self, id: &str) -> Result<Contact, BillyError> {
        let endpoint = format!("/contacts/{}", urlencoding::encode(id));
        let response = self.send(ApiRequest::get(&endpoint)).await?;
        envelope::entity(&endpoint, &response.body, "contact", "contacts")
    }

    /// Creates a contact.
    ///
    /// The create call only accepts name, type and country. Email and phone
    /// are applied with a follow-up update.
    pub async fn create_contact(&self, contact: &NewContact) -> Result<Contact, BillyError> {
        if contact.name.trim().is_empty() {
            return Err(BillyError::InvalidInput("a contact needs a name".to_string()));
        }

        let payload = json!({
            "contact": {
                "name": contact.name,
                "type": contact_type_str(contact.contact_type),
                "countryId": contact.country_id.as_deref().unwrap_or(DEFAULT_COUNTRY),
            }
        });
        let endpoint = "/contacts";
        let response = self.send(ApiRequest::post(endpoint, payload)).await?;
        let created: Contact = envelope::entity(endpoint, &response.body, "contact", "contacts")?;

        if contact.email.is_none() && contact.phone.is_none() {
            return Ok(created);
        }
        let details = ContactUpdate {
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            ..ContactUpdate::default()
        };
        self.put_contact(&created.id, &created.name, &details).await
    }

    /// Updates a contact.
    ///
    /// An email is written as a contact person named after the contact; when
    /// the update carries no name, the current one is read first.
    pub async fn update_contact(&self, id: &str, update: &ContactUpdate) -> Result<Contact, BillyError> {
        if update.is_empty() {
            return Err(BillyError::InvalidInput("contact update has no fields".to_string()));
        }

        let name = match (&update.name, &update.email) {
            (Some(name), _) => name.clone(),
            (None, Some(_)) => self.get_contact(id).await?.name,
            (None, None) => String::new(),
        };
        self.put_contact(id, &name, update).await
    }

    async fn put_contact(&self, id: &str, person_name: &str, update: &ContactUpdate) -> Result<Contact, BillyError> {
        let endpoint = format!("/contacts/{}", urlencoding::encode(id));
        let payload = contact_update_payload(person_name, update);
        let response = self.send(ApiRequest::put(&endpoint, payload)).await?;
        envelope::entity(&endpoint, &response.body, "contact", "contacts")
    }
}

/// The update payload.
///
/// Phone stays on the contact itself; email travels in
/// `contactPersons: [{ name, email }]`, whose entries never carry a phone.
pub fn contact_update_payload(person_name: &str, update: &ContactUpdate) -> Value {
    let mut contact = Map::new();
    let mut put = |key: &str, value: &Option<String>| {
        if let Some(value) = value {
            contact.insert(key.to_string(), Value::String(value.clone()));
        }
    };
    put("name", &update.name);
    put("phone", &update.phone);
    put("countryId", &update.country_id);
    put("street", &update.street);
    put("zipcode", &update.zipcode);
    put("cityText", &update.city_text);

    if let Some(email) = &update.email {
        let person = ContactPerson {
            id: None,
            name: person_name.to_string(),
            email: Some(email.clone()),
        };
        contact.insert("contactPersons".to_string(), json!([person]));
    }

    json!({ "contact": contact })
}

fn contact_type_str(contact_type: ContactType) -> &'static str {
    match contact_type {
        ContactType::Company => "company",
        ContactType::Person => "person",
    }
}
