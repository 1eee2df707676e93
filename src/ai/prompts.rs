//! Prompt templates.

/// System prompt for the per-document relevance check.
pub fn relevance_prompt(action: &str) -> String {
    format!(
        r"You are an expert in government rules, codes, and regulations. You will be given two inputs:
1 - A document to examine. This is the CONTEXT.
2 - An action or desired outcome and a location where that action or outcome will occur. This is the USER action/outcome.

You must determine whether the document is relevant to the action/outcome and the location information provided.
The document will have information on rules, regulations, laws, codes, processes, licenses, permits, certifications, and other paperwork.
To be relevant, the document must contain information that can help someone take the specified action or accomplish the specified goal.
The document must also apply to the location specified.
The document is not relevant if it is meant for a different city, county, state, or country than the specified location.

Examples:
1 - If the desired outcome is to open a restaurant in Atlanta, Georgia,
then a document from the county of Fulton County about Food Service Permits is relevant.
2 - If the desired outcome is to open a restaurant in Atlanta, Georgia,
then a document from the city of San Diego about Food Service Permits is not relevant.
3 - If the desired outcome is to become a barber in Butte, Montana,
then a document about forestry is not relevant.

If the document is relevant to the action and location, return the answer only as Yes.
Do not include any other output except Yes.
If the document is not relevant to the action and location, return the answer only as No.
Do not include any other output except No.

USER:
{action}
"
    )
}

/// System prompt for the permit report, with optional extra context.
pub fn report_prompt(context: &str) -> String {
    format!(
        r#"You are an expert in government rules, codes, and regulations.
As input, you will receive an action that a person wants to accomplish and a location where that action will be performed.
Determine all of licenses, permits, certifications, and other paperwork required to accomplish the action in the location.
Include city, county, state, and federal requirements. Include insurance requirements.
Include any additional information that is available in CONTEXT.
Structure the answer as a Markdown formatted table and do not return any other output except for the table.
Make sure that the outputted table is formatted in valid Markdown. "|" must be used to separate table cells, not "||".
Column 1 is the needed permit, document, or action required.
Column 2 is the organization, company, agency, office, bureau, or other entity for which the permit/document is required.
Column 3 is a link to the website for the entity identified in Column 2.
Column 4 is the type of entity in Column 2. Options are City, County, State, Federal, Private, Other.
Column 5 is a list of requirements, actions, prerequisites, and/or paperwork needed to complete the item in Column 1.
Column 6 is the regulatory source (document, code, statute, rule) that governs the item in Column 1.
Column 7 is a link to the website for the item identified in Column 6.

Here is an example of an input and output:
Input: I want to open a restaurant in Atlanta, Georgia.
Output:
Document/Permit | Agency | Agency Link | Agency Type | Requirements | Regulatory Source | Regulatory Source Link
Zoning Verification | Atlanta Office of Zoning and Development | https://www.atlantaga.gov/government/departments/city-planning/about-dcp/office-of-zoning-development | City | Verify the property is zoned for a restaurant before signing lease. | |
Register Business | Georgia Secretary of State | https://sos.ga.gov/ | State | Requirements are available at https://sos.ga.gov/how-to-guide/how-guide-register-domestic-entity | Business Services Website | https://sos.ga.gov/corporations-division-georgia-secretary-states-office
Employer Identification Number (EIN) | Internal Revenue Service (IRS) | https://www.irs.gov/businesses | Federal | Establish a LLC or Corporation first | EIN webform | https://www.irs.gov/businesses/small-businesses-self-employed/get-an-employer-identification-number
State Taxpayer Identification Number (STIN) | GA Dept of Revenue | https://dor.georgia.gov/ | State | Register the business to collect sales tax. | Georgia Tax Center | https://gtc.dor.ga.gov/_/
Building Permits | Atlanta Office of Buildings | https://www.atlantaga.gov/government/departments/city-planning/about-dcp/office-of-buildings | City | Submit architectural and engineering plans | |
Wastewater Discharge Permit | Atlanta Department of Watershed Management | https://atlantawatershed.org/ | City | Grease trap sizing & approval. | Food Service Wastewater Discharge Permit Application |
Sign Permit | Atlanta Office of Buildings | https://www.atlantaga.gov/government/departments/city-planning/about-dcp/office-of-buildings | City | Sign Permit Application | |
Food Service Permit | Fulton County Board of Health | https://fultoncountyboh.com/ | County | Food Service Permit Application, Verification of Residency, Menu, Floor Plans, specification sheets for all kitchen equipment | |
Certified Food Safety Manager | ServSafe | https://www.servsafe.com/ | Private | Complete exam and post certificate at the restaurant | |
City Alcohol License | Atlanta Police Department License and Permits Unit | https://www.atlantapd.org/business/license-and-permits-unit | City | Requirements are here https://www.atlantapd.org/business/alcohol-licenses | |
State Alcohol License | GA Dept of Revenue | https://dor.georgia.gov/ | State | Obtain the City Alcohol License first | |
Certificate of Occupancy | Atlanta Office of Buildings | https://www.atlantaga.gov/government/departments/city-planning/about-dcp/office-of-buildings | City | Passed all Fire, Health, and Building inspections. | |
Occupational Tax Certificate | Atlanta Office of Revenue | https://www.atlantaga.gov/government/departments/finance/office-of-revenue | City | Need Certificate of Occupancy first. Need New Business Tax Application, SAVE, & E-Verify affidavits. | https://www.atlantaga.gov/government/departments/finance/office-of-revenue/apply-for-a-new-business-occupational-tax-certificate | https://www.atlantaga.gov/government/departments/finance/office-of-revenue/apply-for-a-new-business-occupational-tax-certificate

CONTEXT:
{context}
"#
    )
}

/// First step of refine synthesis: answer from one document.
pub fn initial_context_prompt(query: &str) -> String {
    format!(
        r"The attached document is context information.
Given the context information and not prior knowledge, answer the query.
Keep the answer short and list only concrete requirements, permits, and agencies.
Query: {query}
Answer:"
    )
}

/// Later steps of refine synthesis: improve the running answer with one more document.
pub fn refine_context_prompt(query: &str, existing_answer: &str) -> String {
    format!(
        r"The original query is as follows: {query}
We have provided an existing answer: {existing_answer}
We have the opportunity to refine the existing answer (only if needed) with the attached document.
Given the new context, refine the original answer to better answer the query.
If the context isn't useful, return the original answer.
Refined Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_prompt_embeds_action() {
        let prompt = relevance_prompt("I want to open a food truck in Atlanta, Georgia.");
        assert!(prompt.contains("USER:\nI want to open a food truck in Atlanta, Georgia."));
        assert!(prompt.contains("return the answer only as Yes"));
    }

    #[test]
    fn test_report_prompt_ends_with_context() {
        let prompt = report_prompt("Fulton County requires a mobile unit permit.");
        assert!(prompt.contains("Column 7"));
        assert!(prompt.trim_end().ends_with("CONTEXT:\nFulton County requires a mobile unit permit."));
    }

    #[test]
    fn test_refine_prompt_carries_answer() {
        let prompt = refine_context_prompt("open a barber shop", "Need a barber license.");
        assert!(prompt.contains("open a barber shop"));
        assert!(prompt.contains("Need a barber license."));
        assert!(initial_context_prompt("open a barber shop").contains("Query: open a barber shop"));
    }
}
