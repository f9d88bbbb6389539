//! Bilingual channel bot: operators submit posts in one language, review a
//! machine translation, and publish both versions to a channel whose posts
//! readers can switch between languages.
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod markup;
pub mod model;
pub mod presenter;
pub mod publish;
pub mod service;
pub mod session;
pub mod toggle;
pub mod translator;
pub mod validator;
