//! A textual image format.
//!
//! Every non-empty line that does not start with `#` is a directive:
//!
//! ```text
//! assembly Core, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089
//! declares-root-type
//! references Base, Version=1.0.0.0
//! module Core.Extra.netmodule
//! embedded-local-types
//! ```
//!
//! An assembly image starts with `assembly` which opens its manifest module named after the
//! assembly. A module image starts with `module` instead. Every further `module` directive
//! opens a new module of the assembly. The other directives describe the current module.

use crate::{AssemblyImage, BadImageFormat, MetadataReader, ModuleImage};
use derivation::{FromStr, Str};
use identity::AssemblyIdentity;

#[derive(Clone, Copy, Default, Debug)]
pub struct ManifestReader;

impl MetadataReader for ManifestReader {
    fn read_assembly(&self, bytes: &[u8]) -> Result<AssemblyImage, BadImageFormat> {
        let mut directives = directives(bytes)?;

        let identity = match directives.next().transpose()? {
            Some((_, Directive::Assembly, identity)) => parse_identity(identity)?,
            Some((line, directive, _)) => {
                return Err(BadImageFormat::new(format!(
                    "expected an ‘assembly’ directive but found ‘{}’",
                    directive.name()
                ))
                .at(line));
            }
            None => return Err(BadImageFormat::new("the image is empty")),
        };

        let mut modules = vec![ModuleImage::new(format!("{}.dll", identity.name()))];

        for directive in directives {
            let (line, directive, argument) = directive?;

            match directive {
                Directive::Assembly => {
                    return Err(BadImageFormat::new("duplicate ‘assembly’ directive").at(line));
                }
                Directive::Module => modules.push(ModuleImage::new(parse_name(argument, line)?)),
                _ => {
                    if let Some(module) = modules.last_mut() {
                        describe(module, directive, argument, line)?;
                    }
                }
            }
        }

        Ok(AssemblyImage { identity, modules })
    }

    fn read_module(&self, bytes: &[u8]) -> Result<ModuleImage, BadImageFormat> {
        let mut directives = directives(bytes)?;

        let mut module = match directives.next().transpose()? {
            Some((line, Directive::Module, name)) => ModuleImage::new(parse_name(name, line)?),
            Some((line, directive, _)) => {
                return Err(BadImageFormat::new(format!(
                    "expected a ‘module’ directive but found ‘{}’",
                    directive.name()
                ))
                .at(line));
            }
            None => return Err(BadImageFormat::new("the image is empty")),
        };

        for directive in directives {
            let (line, directive, argument) = directive?;

            match directive {
                Directive::Assembly | Directive::Module => {
                    return Err(BadImageFormat::new(format!(
                        "a module image may not contain a ‘{}’ directive",
                        directive.name()
                    ))
                    .at(line));
                }
                _ => describe(&mut module, directive, argument, line)?,
            }
        }

        Ok(module)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Str, FromStr)]
#[format(dash_case)]
enum Directive {
    Assembly,
    Module,
    References,
    DeclaresRootType,
    EmbeddedLocalTypes,
}

type Line<'a> = (usize, Directive, &'a str);

fn directives(
    bytes: &[u8],
) -> Result<impl Iterator<Item = Result<Line<'_>, BadImageFormat>>, BadImageFormat> {
    let source = std::str::from_utf8(bytes)
        .map_err(|_| BadImageFormat::new("the image is not valid UTF-8"))?;

    Ok(source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            let (keyword, argument) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let directive = keyword.parse().map_err(|()| {
                BadImageFormat::new(format!("unknown directive ‘{keyword}’")).at(number)
            })?;

            Ok((number, directive, argument.trim()))
        }))
}

fn describe(
    module: &mut ModuleImage,
    directive: Directive,
    argument: &str,
    line: usize,
) -> Result<(), BadImageFormat> {
    match directive {
        Directive::References => {
            let identity = parse_identity(argument).map_err(|error| error.at(line))?;
            module.referenced_assemblies.push(identity);
        }
        Directive::DeclaresRootType => module.declares_root_type = true,
        Directive::EmbeddedLocalTypes => module.has_embedded_local_types = true,
        Directive::Assembly | Directive::Module => unreachable!(),
    }

    Ok(())
}

fn parse_identity(source: &str) -> Result<AssemblyIdentity, BadImageFormat> {
    source.parse().map_err(|error| BadImageFormat::new(format!("invalid assembly identity: {error}")))
}

fn parse_name(source: &str, line: usize) -> Result<&str, BadImageFormat> {
    if source.is_empty() {
        Err(BadImageFormat::new("the module lacks a name").at(line))
    } else {
        Ok(source)
    }
}

#[cfg(test)]
mod test {
    use super::ManifestReader;
    use crate::{BadImageFormat, ImageKind, MetadataReader, ModuleImage};
    use identity::{AssemblyIdentity, Version};

    #[test]
    fn read_assembly_with_two_modules() {
        let image = ManifestReader
            .read_assembly(
                b"\
# the core library
assembly Core, Version=4.0.0.0
declares-root-type
references Base, Version=1.0.0.0
module Core.Extra.netmodule
embedded-local-types
references Extra",
            )
            .unwrap();

        assert_eq!(image.identity, AssemblyIdentity::new("Core").with_version(Version::new(4, 0, 0, 0)));
        assert_eq!(image.modules.len(), 2);
        assert_eq!(image.modules[0].name, "Core.dll");
        assert_eq!(image.modules[1].name, "Core.Extra.netmodule");
        assert!(image.declares_root_type());
        assert!(image.has_embedded_local_types());
        assert_eq!(
            image.referenced_assemblies().map(AssemblyIdentity::name).collect::<Vec<_>>(),
            ["Base", "Extra"]
        );
    }

    #[test]
    fn read_module() {
        let module = ManifestReader.read_module(b"module Part.netmodule\nreferences Core").unwrap();

        assert_eq!(
            module,
            ModuleImage {
                name: "Part.netmodule".into(),
                referenced_assemblies: vec![AssemblyIdentity::new("Core")],
                declares_root_type: false,
                has_embedded_local_types: false,
            }
        );
    }

    #[test]
    fn module_is_not_an_assembly() {
        let error = ManifestReader.read(b"module Part.netmodule", ImageKind::Assembly).unwrap_err();

        assert_eq!(error.line, Some(1));
    }

    #[test]
    fn assembly_is_not_a_module() {
        assert!(ManifestReader.read_module(b"assembly Core").is_err());
    }

    #[test]
    fn binary_garbage_is_rejected() {
        assert_eq!(
            ManifestReader.read_assembly(&[0x4d, 0x5a, 0x90, 0x00, 0xff]),
            Err(BadImageFormat::new("the image is not valid UTF-8"))
        );
    }

    #[test]
    fn unknown_directive_is_located() {
        let error = ManifestReader.read_assembly(b"assembly Core\n\nexports Thing").unwrap_err();

        assert_eq!(error.to_string(), "line 3: unknown directive ‘exports’");
    }
}
