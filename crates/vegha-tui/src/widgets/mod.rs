pub mod metric_card;
pub mod status_indicator;
