mod channel;
mod helpers;
mod http;
