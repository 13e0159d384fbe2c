use clap::Subcommand;

use super::config::ConfigArgs;
use super::inspect::{PageSourceArgs, ParseChainArgs, XmlArgs};
use super::resolve::{ParentArgs, ResolveArgs, SiblingArgs};

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Resolve a locator against a tree fixture
    Resolve(ResolveArgs),

    /// Find elements matching a parent locator that contain a child
    Parent(ParentArgs),

    /// Find elements matching a sibling locator near a child
    Sibling(SiblingArgs),

    /// Parse a class chain and show its steps
    ParseChain(ParseChainArgs),

    /// Print the XML projection XPath runs against
    Xml(XmlArgs),

    /// Print the page source of a tree fixture
    PageSource(PageSourceArgs),

    /// List the element type registry
    Types,

    /// Manage uiloc configuration
    Config(ConfigArgs),

    /// Show version and build information
    Version,
}
