//! Product catalog enums and listing options

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender { Men, Women, #[default] Unisex, Kids }

impl FromStr for Gender {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MEN" => Ok(Self::Men),
            "WOMEN" => Ok(Self::Women),
            "UNISEX" => Ok(Self::Unisex),
            "KIDS" => Ok(Self::Kids),
            _ => Err(ProductError::UnknownGender(s.to_string())),
        }
    }
}

/// Sort order for product listings. Unknown values fall back to newest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductSort { #[default] Newest, PriceAsc, PriceDesc, Name, Rating }

impl ProductSort {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("price_asc" | "price-asc") => Self::PriceAsc,
            Some("price_desc" | "price-desc") => Self::PriceDesc,
            Some("name") => Self::Name,
            Some("rating") => Self::Rating,
            _ => Self::Newest,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC",
            Self::PriceAsc => "p.price ASC, p.created_at DESC",
            Self::PriceDesc => "p.price DESC, p.created_at DESC",
            Self::Name => "p.name ASC",
            Self::Rating => "average_rating DESC NULLS LAST, p.created_at DESC",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("Invalid gender: {0}")]
    UnknownGender(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!("women".parse::<Gender>().unwrap(), Gender::Women);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_sort_fallback() {
        assert_eq!(ProductSort::parse(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse(Some("bogus")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(None).order_by(), "p.created_at DESC");
    }
}
