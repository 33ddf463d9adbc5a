pub mod pokemon;

pub use pokemon::{FetchPokeApiTool, FinalResponseTool, PokeApi, PokemonHandler};
