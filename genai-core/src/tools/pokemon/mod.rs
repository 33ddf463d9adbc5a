pub mod structs;
pub mod pokemon;

#[cfg(test)]
mod tests;

pub use structs::{FetchPokemonParams, FinalResponseParams, Pokemon};
pub use pokemon::{FetchPokeApiTool, FinalResponseTool, PokeApi, PokemonHandler, FETCH_POKEAPI, FINAL_RESPONSE, POKEAPI_URL};
