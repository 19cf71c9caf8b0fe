pub mod iri;
pub mod record;
pub mod vocab;
