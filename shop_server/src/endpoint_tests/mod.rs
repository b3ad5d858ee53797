mod helpers;

mod catalog;
mod orders;
mod webhooks;
