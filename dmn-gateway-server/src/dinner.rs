//! Field tables binding the dinner messages to the Dinner model
//!
//! The request schema and the model's variable names are decoupled here:
//! renaming a variable in the model means editing these tables only.

use dmn_gateway_core::{
    ExtractedFields, FieldKind, FromBindings, InputField, IntoContext, ModelIdentifier,
    OutputField, Result, Value, ValueKind,
};

use crate::proto::dinner::v1::{DinnerInput, DinnerOutput};

pub const DINNER_NAMESPACE: &str =
    "http://www.trisotech.com/definitions/_0c45df24-0d57-4acc-b296-b4cba8b71a36";
pub const DINNER_MODEL: &str = "Dinner";
pub const DINNER_ARTIFACT: &str = "dinner.yaml";

/// The dinner model, compiled into the binary.
pub const DINNER_ARTIFACT_YAML: &str = include_str!("../models/dinner.yaml");

pub fn dinner_model() -> ModelIdentifier {
    ModelIdentifier::new(DINNER_NAMESPACE, DINNER_MODEL, DINNER_ARTIFACT)
}

const INPUT_FIELDS: &[InputField] = &[
    InputField::new(
        "guests_with_children",
        "Guests with children",
        ValueKind::Bool,
    ),
    InputField::new("season", "Season", ValueKind::String),
    InputField::new("number_of_guests", "Number of guests", ValueKind::Number),
    InputField::new("temp", "Temp", ValueKind::Number),
    InputField::new("rain_probability", "Rain Probability", ValueKind::Number),
];

const OUTPUT_FIELDS: &[OutputField] = &[
    OutputField::required("dish", "Dish", FieldKind::String),
    OutputField::required("drinks", "Drinks", FieldKind::StringList),
    OutputField::required("where_to_eat", "Where to eat", FieldKind::String),
];

impl IntoContext for DinnerInput {
    fn input_fields() -> &'static [InputField] {
        INPUT_FIELDS
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "guests_with_children" => Some(self.guests_with_children.into()),
            "season" => Some(self.season.as_str().into()),
            "number_of_guests" => Some(self.number_of_guests.into()),
            "temp" => Some(self.temp.into()),
            "rain_probability" => Some(self.rain_probability.into()),
            _ => None,
        }
    }
}

impl FromBindings for DinnerOutput {
    fn output_fields() -> &'static [OutputField] {
        OUTPUT_FIELDS
    }

    fn from_fields(mut fields: ExtractedFields) -> Result<Self> {
        Ok(DinnerOutput {
            dish: fields.require_string("dish")?,
            drinks: fields.require_string_list("drinks")?,
            where_to_eat: fields.require_string("where_to_eat")?,
        })
    }
}
