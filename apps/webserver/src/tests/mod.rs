mod app;
mod cli;
mod logger;
