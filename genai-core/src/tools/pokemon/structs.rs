use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FetchPokemonParams {
    /// The pokemon name in lowercase, without quotes. E.g. pikachu
    pub pokemon: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FinalResponseParams {
    /// The final response to the user query
    pub response: String,
}

/// The part of a PokeAPI pokemon resource the tool reports on
#[derive(Debug, Clone, Deserialize)]
pub struct Pokemon {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub moves: Vec<PokemonMove>,
    #[serde(default)]
    pub types: Vec<PokemonType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonMove {
    #[serde(rename = "move")]
    pub move_: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonType {
    #[serde(rename = "type")]
    pub type_: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

impl Pokemon {
    /// `ID: 94, MovesCount: 2, Moves: [a, b], Types: [ghost, poison]`
    pub fn summary(&self) -> String {
        let moves: Vec<&str> = self.moves.iter().map(|m| m.move_.name.as_str()).collect();
        let types: Vec<&str> = self.types.iter().map(|t| t.type_.name.as_str()).collect();
        format!(
            "ID: {}, MovesCount: {}, Moves: [{}], Types: [{}]",
            self.id,
            moves.len(),
            moves.join(", "),
            types.join(", ")
        )
    }
}
