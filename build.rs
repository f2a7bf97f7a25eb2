use vergen::{BuildBuilder, CargoBuilder, Emitter};
use vergen_gitcl::GitclBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let build = BuildBuilder::all_build()?;
	let cargo = CargoBuilder::all_cargo()?;
	let git = GitclBuilder::default().sha(true).branch(true).build()?;

	Emitter::default()
		.add_instructions(&build)?
		.add_instructions(&cargo)?
		.add_instructions(&git)?
		.emit()?;

	Ok(())
}
