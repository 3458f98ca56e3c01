use super::atomic::ReportableModel;
use serde::de;
use serde::Deserializer;
use std::collections::HashMap;

use lazy_static::lazy_static;

use std::sync::Mutex;

pub type ModelConstructor = fn(serde_yaml::Value) -> Option<Box<dyn ReportableModel>>;
lazy_static! {
    static ref CONSTRUCTORS: Mutex<HashMap<&'static str, ModelConstructor>> = {
        let mut m = HashMap::new();
        m.insert(
            "Commander",
            super::Commander::from_value as ModelConstructor,
        );
        m.insert(
            "Generator",
            super::Generator::from_value as ModelConstructor,
        );
        m.insert("Sensor", super::Sensor::from_value as ModelConstructor);
        m.insert("Storage", super::Storage::from_value as ModelConstructor);
        Mutex::new(m)
    };
    static ref VARIANTS: Vec<&'static str> = {
        CONSTRUCTORS
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k)
            .copied()
            .collect::<Vec<_>>()
    };
}

pub fn register(model_type: &'static str, model_constructor: ModelConstructor) {
    CONSTRUCTORS
        .lock()
        .unwrap()
        .insert(model_type, model_constructor);
}

pub fn create<'de, D: Deserializer<'de>>(
    model_type: &str,
    extra_fields: serde_yaml::Value,
) -> Result<Box<dyn ReportableModel>, D::Error> {
    let model = match CONSTRUCTORS.lock().unwrap().get(model_type) {
        Some(constructor) => constructor(extra_fields),
        None => None,
    };
    match model {
        Some(model) => Ok(model),
        None => Err(de::Error::unknown_variant(model_type, &VARIANTS)),
    }
}
