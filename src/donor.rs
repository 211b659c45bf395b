// PayPal transaction export -> NPSP data import template.
//
// Every PayPal column must be present in the export, even the ones that are
// not carried over; rows without a name or gross amount are skipped.
use crate::error::ReportResult;
use crate::loader::{read_rows, ExtractSpec};
use crate::reports::{ReportKind, ReportOutput};
use crate::types::Record;
use std::path::Path;
use tracing::warn;

pub const PAYPAL_COLUMNS: [&str; 45] = [
    "Date",
    "Time",
    "Time Zone",
    "Name",
    "Type",
    "Status",
    "Subject",
    "Currency",
    "Gross",
    "Fee",
    "Net",
    "Note",
    "From Email Address",
    "To Email Address",
    "Transaction ID",
    "Payment Type",
    "Shipping address",
    "Address Status",
    "Item Title",
    "Item ID",
    "Shipping and Handling Amount",
    "Insurance Amount",
    "Sales Tax",
    "Option 1 Name",
    "Option 1 Value",
    "Option 2 Name",
    "Option 2 Value",
    "Auction Site",
    "Buyer ID",
    "Item URL",
    "Closing Date",
    "Reference Txn ID",
    "Invoice Number",
    "Subscription Number",
    "Custom Number",
    "Receipt ID",
    "Available Balance",
    "Address Line 1",
    "Address Line 2/District",
    "Town/City",
    "State/Province",
    "Zip/Postal Code",
    "Country",
    "Contact Phone Number",
    "Balance Impact",
];

pub const NPSP_COLUMNS: [&str; 64] = [
    "Contact1 Salutation",
    "Contact1 First Name",
    "Contact1 Last Name",
    "Contact1 Birthdate",
    "Contact1 Title",
    "Contact1 Personal Email",
    "Contact1 Work Email",
    "Contact1 Alternate Email",
    "Contact1 Preferred Email",
    "Contact1 Home Phone",
    "Contact1 Work Phone",
    "Contact1 Mobile Phone",
    "Contact1 Other Phone",
    "Contact1 Preferred Phone",
    "Contact2 Salutation",
    "Contact2 First Name",
    "Contact2 Last Name",
    "Contact2 Birthdate",
    "Contact2 Title",
    "Contact2 Personal Email",
    "Contact2 Work Email",
    "Contact2 Alternate Email",
    "Contact2 Preferred Email",
    "Contact2 Home Phone",
    "Contact2 Work Phone",
    "Contact2 Mobile Phone",
    "Contact2 Other Phone",
    "Contact2 Preferred Phone",
    "Account1 Name",
    "Account1 Street",
    "Account1 City",
    "Account1 State/Province",
    "Account1 Zip/Postal Code",
    "Account1 Country",
    "Account1 Phone",
    "Account1 Website",
    "Account2 Name",
    "Account2 Street",
    "Account2 City",
    "Account2 State/Province",
    "Account2 Zip/Postal Code",
    "Account2 Country",
    "Account2 Phone",
    "Account2 Website",
    "Home Street",
    "Home City",
    "Home State/Province",
    "Home Zip/Postal Code",
    "Home Country",
    "Donation Donor",
    "Donation Amount",
    "Donation Date",
    "Donation Name",
    "Donation Record Type Name",
    "Donation Stage",
    "Donation Type",
    "Donation Description",
    "Donation Member Level",
    "Donation Membership Start Date",
    "Donation Membership End Date",
    "Donation Membership Origin",
    "Donation Campaign Name",
    "Payment Check/Reference Number",
    "Payment Method",
];

const REQUIRED_VALUES: [&str; 2] = ["Name", "Gross"];

/// Straight copies from a PayPal column to an NPSP column.
const COPIED: [(&str, &str); 9] = [
    ("Date", "Donation Date"),
    ("Type", "Donation Type"),
    ("Gross", "Donation Amount"),
    ("From Email Address", "Contact1 Personal Email"),
    ("Note", "Donation Description"),
    ("Town/City", "Home City"),
    ("State/Province", "Home State/Province"),
    ("Zip/Postal Code", "Home Zip/Postal Code"),
    ("Country", "Home Country"),
];

/// Split "First Middle Last" at the last space.
///
/// A single-word name has no first name; the whole name is the last name.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rsplit_once(' ') {
        Some((first, last)) => (first, last),
        None => ("", name),
    }
}

/// Map one PayPal row onto a blank NPSP row.
pub fn remap(row: &Record) -> ReportResult<Record> {
    let mut out = Record::new(row.line());
    for column in NPSP_COLUMNS {
        out.insert(column, "");
    }
    for (from, to) in COPIED {
        out.insert(to, row.require(from)?);
    }

    let name = row.require("Name")?;
    let (first, last) = split_name(name);
    if first.is_empty() {
        warn!("Row {}: name {:?} has no first name", row.line(), name);
    }
    out.insert("Contact1 First Name", first);
    out.insert("Contact1 Last Name", last);

    let mut street = row.require("Address Line 1")?.to_string();
    let line2 = row.require("Address Line 2/District")?;
    if !line2.is_empty() {
        street.push_str(", ");
        street.push_str(line2);
    }
    out.insert("Home Street", street);
    Ok(out)
}

pub fn donor_import(input: &Path) -> ReportResult<ReportOutput> {
    let spec = ExtractSpec {
        non_empty: &REQUIRED_VALUES,
        ..ExtractSpec::all(&PAYPAL_COLUMNS)
    };
    let rows = read_rows(input, &spec)?
        .iter()
        .map(remap)
        .collect::<ReportResult<Vec<Record>>>()?;
    Ok(ReportOutput {
        kind: ReportKind::DonorImport,
        columns: NPSP_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    })
}
