pub mod regmap;
pub mod rf_chip;
