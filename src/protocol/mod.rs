pub mod block_change;
pub mod chat;
pub mod chunk_data;
pub mod client_settings;
pub mod codec;
pub mod crypto;
pub mod entity;
pub mod handshake;
pub mod held_item_change;
pub mod interaction;
pub mod join_game;
pub mod keep_alive;
pub mod login;
pub mod packet;
pub mod player;
pub mod player_position_and_look;
pub mod status;
