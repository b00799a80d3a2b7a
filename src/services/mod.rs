pub mod dialogflow_service;
pub mod translate_service;
