use serde::de::DeserializeOwned;

use crate::error::BackendError;

/// Deserialize a provider payload; decode errors name the JSON path that broke.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, BackendError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        BackendError::Decode(format!("at JSON path {path} → {}", err.into_inner()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Envelope {
        #[allow(dead_code)]
        output: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    struct Item {
        #[allow(dead_code)]
        text: String,
    }

    #[test]
    fn decode_error_carries_path() {
        let err = from_str_with_path::<Envelope>(r#"{"output": [{"text": "a"}, {"text": 5}]}"#).unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("output[1].text"), "{err}");
    }
}
